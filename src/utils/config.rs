//! Configuration parameters struct parsing helper.

/// Composes a configuration struct from its default values, then overwrites
/// given fields by parsing from given TOML string if it's not `None`. Returns
/// an `Ok(config)` on success, and `Err(TribError)` on parser failure or when
/// the string names a field not listed in the invocation.
///
/// Example:
/// ```no_run
/// # use tribstore::{parsed_config, FrontConfig, TribError};
/// # fn main() -> Result<(), TribError> {
/// # let config_str: Option<&str> = None;
/// let config = parsed_config!(config_str => FrontConfig; max_trib_fetch)?;
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! parsed_config {
    ($config_str:expr => $config_type:ty; $($field:ident),+) => {{
        let config_str: Option<&str> = $config_str;

        // closure helper for easier error returning
        let compose_config = || -> Result<$config_type, $crate::TribError> {
            let mut config: $config_type = Default::default();
            let Some(config_str) = config_str else {
                return Ok(config);
            };

            let mut table = config_str.parse::<toml::Table>()?;

            // traverse through all given field names
            $({
                // if field name found in table (and removed)
                if let Some(v) = table.remove(stringify!($field)) {
                    config.$field = v.try_into()?;
                }
            })+

            // if table is not empty at this time, some parsed keys are not
            // expected hence invalid
            if let Some(key) = table.keys().next() {
                return Err($crate::TribError::Config(format!(
                    "invalid field name '{}' in config",
                    key,
                )));
            }

            Ok(config)
        };

        compose_config()
    }};
}
