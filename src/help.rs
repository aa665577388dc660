//! Usage text rendered from the registry.

use std::fmt;

use crate::registry::Registry;

/// Displays the usage text for a registry:
///
/// ```text
/// Serves files.
///
/// Settings:
///   port  -p, --port  [env: APP_PORT]
///       Listen port.
///   root  -r <value>
///
/// Examples:
///   app -p 8080
/// ```
///
/// Greedy aliases are followed by `<value>`, since they always take one.
pub struct Usage<'a>(pub &'a Registry);

impl fmt::Display for Usage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.0;
        let mut sections = 0;

        if !registry.description().is_empty() {
            writeln!(f, "{}", registry.description())?;
            sections += 1;
        }

        if !registry.is_empty() {
            if sections > 0 {
                writeln!(f)?;
            }
            writeln!(f, "Settings:")?;
            for setting in registry.settings() {
                write!(f, "  {}", setting.path())?;
                let aliases: Vec<String> = setting
                    .alias_list()
                    .iter()
                    .map(|alias| {
                        if alias.greedy {
                            format!("{alias} <value>")
                        } else {
                            alias.to_string()
                        }
                    })
                    .collect();
                if !aliases.is_empty() {
                    write!(f, "  {}", aliases.join(", "))?;
                }
                if let Some(env) = setting.env_name() {
                    write!(f, "  [env: {env}]")?;
                }
                writeln!(f)?;
                if !setting.description().is_empty() {
                    writeln!(f, "      {}", setting.description())?;
                }
            }
            sections += 1;
        }

        if !registry.examples().is_empty() {
            if sections > 0 {
                writeln!(f)?;
            }
            writeln!(f, "Examples:")?;
            for example in registry.examples() {
                writeln!(f, "  {example}")?;
            }
        }

        Ok(())
    }
}
