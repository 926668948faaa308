//! Applies `config` assignments of a script on top of the base configuration.

use super::Pass;
use crate::ast::{AssignConfigVarStatement, Ast, Expression, Id, ParameterRef, Visitor};
use crate::config::{Config, ConfigKey, ConfigKind, ConfigSource, ConfigValue};
use crate::errors::{
    config_bool_value_invalid, config_value_invalid, config_value_not_literal,
    config_value_type_mismatch, unknown_config_key, unknown_stack_mode, Diagnostic, Outcome,
};
use crate::params::{parse_int, Params};
use crate::source::InputSpan;

/// Configuration in effect for the program.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptConfig(pub Config);

/// Value of a literal on the right-hand side of a config assignment.
enum Literal {
    Int(i64),
    Str(String),
    StackMode(crate::config::StackMode),
}

impl Literal {
    fn kind_name(&self) -> &'static str {
        match self {
            Literal::Int(_) => "int",
            Literal::Str(_) => "string",
            Literal::StackMode(_) => "stack_mode",
        }
    }
}

/// Name of the literal kind options of `kind` are written with.
fn expected_literal(kind: ConfigKind) -> &'static str {
    match kind {
        ConfigKind::Int | ConfigKind::Bool => "int",
        ConfigKind::StackMode => "stack_mode",
        _ => "string",
    }
}

struct ConfigAnalyser<'a> {
    ast: &'a mut Ast,
    params: &'a Params,
    config: Config,
}

impl<'a> ConfigAnalyser<'a> {
    fn literal(&self, expr: Expression) -> Option<Literal> {
        match expr {
            Expression::Integer(id) => Some(Literal::Int(self.ast[id].value)),
            Expression::String(id) => Some(Literal::Str(self.ast[id].value.clone())),
            Expression::StackMode(id) => Some(Literal::StackMode(self.ast[id].mode)),
            Expression::PositionalParameter(id) => Some(match self.ast[id].param {
                ParameterRef::Count => Literal::Int(self.params.count() as i64),
                ParameterRef::Index(index) => {
                    let value = self.params.get(index, false);
                    match parse_int(value) {
                        Some(value) => Literal::Int(value),
                        None => Literal::Str(value.to_string()),
                    }
                }
            }),
            _ => None,
        }
    }

    fn value(
        &self,
        key: ConfigKey,
        literal: Literal,
        loc: InputSpan,
    ) -> Result<ConfigValue, Diagnostic> {
        let name = key.name();
        let mismatch = |literal: &Literal| {
            config_value_type_mismatch(
                name,
                literal.kind_name(),
                expected_literal(key.kind()),
                loc,
            )
        };

        match (key.kind(), literal) {
            (ConfigKind::Int, Literal::Int(value)) if value < 0 => Err(config_value_invalid(
                name,
                format!("{} is negative", value),
                loc,
            )),
            (ConfigKind::Int, Literal::Int(value)) => Ok(ConfigValue::Int(value as u64)),
            (ConfigKind::Bool, Literal::Int(0)) => Ok(ConfigValue::Bool(false)),
            (ConfigKind::Bool, Literal::Int(1)) => Ok(ConfigValue::Bool(true)),
            (ConfigKind::Bool, Literal::Int(value)) => {
                Err(config_bool_value_invalid(name, value as u64, loc))
            }
            (ConfigKind::String, Literal::Str(value)) => Ok(ConfigValue::String(value)),
            (ConfigKind::StackMode, Literal::StackMode(mode)) => Ok(ConfigValue::StackMode(mode)),
            (ConfigKind::StackMode, literal) => Err(mismatch(&literal)),
            (kind, Literal::Str(value)) if kind.is_textual() => ConfigValue::parse(key, &value)
                .map_err(|error| config_value_invalid(name, error.to_string(), loc)),
            (_, literal) => Err(mismatch(&literal)),
        }
    }

    fn apply(&mut self, assignment: Id<AssignConfigVarStatement>) -> Result<(), Diagnostic> {
        let AssignConfigVarStatement { loc, ref var, expr } = self.ast[assignment];
        let key: ConfigKey = var
            .parse()
            .map_err(|_| unknown_config_key(var, loc))?;

        let literal = match (self.literal(expr), expr) {
            (Some(literal), _) => literal,
            // Bare words are only accepted as stack modes, and all known ones are literals.
            (None, Expression::Identifier(id)) if key.kind() == ConfigKind::StackMode => {
                return Err(unknown_stack_mode(&self.ast[id].name, expr.location(self.ast)));
            }
            (None, _) => return Err(config_value_not_literal(key.name(), loc)),
        };

        let value = self.value(key, literal, loc)?;
        self.config
            .set(key, value, ConfigSource::Script)
            .map_err(|error| config_value_invalid(key.name(), error.to_string(), loc))
    }
}

impl<'a> Visitor for ConfigAnalyser<'a> {
    type Output = Outcome<()>;

    fn ast(&mut self) -> &mut Ast {
        self.ast
    }

    fn visit_assign_config_var(
        &mut self,
        assignment: Id<AssignConfigVarStatement>,
    ) -> Outcome<()> {
        match self.apply(assignment) {
            Ok(()) => Outcome::success(()),
            Err(error) => Outcome::failure(vec![error]),
        }
    }
}

pub fn pass() -> Pass {
    Pass::producing("ConfigAnalyser", |ctx| {
        let mut analyser = ConfigAnalyser {
            ast: ctx.ast,
            params: ctx.params,
            config: ctx.options.config.clone(),
        };
        let outcome = analyser.visit(ctx.program);
        let config = analyser.config;
        outcome.map(|()| ScriptConfig(config))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MissingProbes, StackMode};
    use crate::options::CompilerOptions;
    use crate::passes::test_utils::{messages, run_collecting, run_passes_with};
    use crate::platform::StaticTypeDatabase;

    fn analyse(source: &str) -> (Outcome<()>, Option<ScriptConfig>) {
        let (_, outcome, config) = run_collecting::<ScriptConfig>(source, vec![pass()]);
        (outcome, config)
    }

    fn errors(source: &str) -> Vec<String> {
        messages(analyse(source).0.errors())
    }

    #[test]
    fn applies_assignments() {
        let (outcome, config) = analyse(
            "config = { max_strlen = 128; stack_mode = perf; missing_probes = \"warn\" } BEGIN {}",
        );
        assert!(outcome.is_ok());
        let ScriptConfig(config) = config.unwrap();
        assert_eq!(config.max_strlen(), 128);
        assert_eq!(config.stack_mode(), StackMode::Perf);
        assert_eq!(config.missing_probes(), MissingProbes::Warn);
        assert_eq!(config.source(ConfigKey::MaxStrlen), ConfigSource::Script);
        assert_eq!(config.source(ConfigKey::MaxMapKeys), ConfigSource::Default);
    }

    #[test]
    fn accepts_upper_case_names() {
        let (outcome, config) = analyse("config = { MAX_MAP_KEYS = 10 } BEGIN {}");
        assert!(outcome.is_ok());
        assert_eq!(config.unwrap().0.max_map_keys(), 10);
    }

    #[test]
    fn reports_unknown_keys() {
        assert_eq!(
            errors("config = { max_nothing = 1 } BEGIN {}"),
            vec!["Unrecognized config variable: max_nothing"]
        );
    }

    #[test]
    fn requires_literals() {
        assert_eq!(
            errors("config = { max_strlen = 1 + 2 } BEGIN {}"),
            vec!["Assignment for max_strlen must be literal."]
        );
    }

    #[test]
    fn checks_value_kinds() {
        assert_eq!(
            errors("config = { max_strlen = \"long\" } BEGIN {}"),
            vec!["Invalid type for max_strlen. Type: string. Expected Type: int"]
        );
        assert_eq!(
            errors("config = { cpp_demangle = 2 } BEGIN {}"),
            vec!["Invalid value for cpp_demangle. Needs to be 0 or 1. Value: 2"]
        );
        assert_eq!(
            errors("config = { stack_mode = fancy } BEGIN {}"),
            vec!["Unknown stack mode: 'fancy'"]
        );
        assert_eq!(
            errors("config = { symbol_source = \"guess\" } BEGIN {}"),
            vec!["Invalid value for symbol_source"]
        );
    }

    #[test]
    fn reports_every_bad_assignment() {
        assert_eq!(
            errors("config = { a = 1; max_strlen = \"x\"; b = 2 } BEGIN {}").len(),
            3
        );
    }

    #[test]
    fn positional_parameters_are_substituted() {
        let (_, _, outcome) = run_passes_with(
            "config = { max_strlen = $1; license = $2 } BEGIN {}",
            &Params::new(vec!["100".to_string(), "MIT".to_string()]),
            &CompilerOptions::default(),
            &StaticTypeDatabase::new(),
            vec![pass()],
        );
        assert!(outcome.is_ok());
    }
}
