pub mod path;
pub mod reference;

use super::params::ArgValues;

/// Read a required number. The checker guarantees presence, so a miss here means
/// the handler was registered against the wrong schema.
pub(crate) fn require_number(args: &ArgValues, name: &str) -> Result<f64, String> {
    args.number(name)
        .ok_or_else(|| format!("argument missing: {name}"))
}
