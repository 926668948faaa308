mod e0001_syntax_error;
mod e0002_type_resolution_failed;
mod e0003_unknown_config_key;
mod e0004_config_value_not_literal;
mod e0005_config_value_type_mismatch;
mod e0006_config_value_invalid;
mod e0007_missing_return;
mod e0008_aot_unsupported;
mod e0009_node_count_exceeded;
mod e0010_division_by_zero;
mod e0011_map_key_mismatch;
mod e0012_map_value_mismatch;
mod e0013_mixed_probe_arguments;
mod e0014_illegal_array_type;
mod e0015_unknown_stack_mode;
mod e0016_invalid_attach_point;
mod e0017_parameter_not_numeric;
mod e0018_function_redefined;
mod w0001_unreachable_code;
mod w0002_probe_arguments_unresolved;
mod w0003_map_type_unresolved;
mod w0004_type_deferred;

pub mod constructors {
    pub use super::e0001_syntax_error::syntax_error;
    pub use super::e0002_type_resolution_failed::type_resolution_failed;
    pub use super::e0003_unknown_config_key::unknown_config_key;
    pub use super::e0004_config_value_not_literal::config_value_not_literal;
    pub use super::e0005_config_value_type_mismatch::config_value_type_mismatch;
    pub use super::e0006_config_value_invalid::{config_bool_value_invalid, config_value_invalid};
    pub use super::e0007_missing_return::missing_return;
    pub use super::e0008_aot_unsupported::aot_unsupported;
    pub use super::e0009_node_count_exceeded::node_count_exceeded;
    pub use super::e0010_division_by_zero::division_by_zero;
    pub use super::e0011_map_key_mismatch::map_key_mismatch;
    pub use super::e0012_map_value_mismatch::map_value_mismatch;
    pub use super::e0013_mixed_probe_arguments::mixed_probe_arguments;
    pub use super::e0014_illegal_array_type::illegal_array_type;
    pub use super::e0015_unknown_stack_mode::unknown_stack_mode;
    pub use super::e0016_invalid_attach_point::invalid_attach_point;
    pub use super::e0017_parameter_not_numeric::parameter_not_numeric;
    pub use super::e0018_function_redefined::function_redefined;
    pub use super::w0001_unreachable_code::unreachable_code;
    pub use super::w0002_probe_arguments_unresolved::probe_arguments_unresolved;
    pub use super::w0003_map_type_unresolved::map_type_unresolved;
    pub use super::w0004_type_deferred::type_deferred;
}
