use std::path::PathBuf;

use log::warn;
use teloxide::types::UserId;

const DEFAULT_CATALOG_PATH: &str = "tasks.json";
const DEFAULT_DB_PATH: &str = "db.sqlite";

/// Runtime settings. The bot token itself is read by `Bot::from_env`
/// from `TELOXIDE_TOKEN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Chat that receives new-user notices and error reports.
    pub operator: Option<UserId>,
    pub catalog_path: PathBuf,
    pub db_path: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let operator = var("OPERATOR_ID").and_then(|raw| match raw.trim().parse::<u64>() {
            Ok(id) => Some(UserId(id)),
            Err(_) => {
                warn!("OPERATOR_ID {:?} is not a user id, operator messages are off", raw);
                None
            }
        });

        Self {
            operator,
            catalog_path: var("CATALOG_PATH")
                .unwrap_or_else(|| DEFAULT_CATALOG_PATH.to_string())
                .into(),
            db_path: var("DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]);
        assert_eq!(config.operator, None);
        assert_eq!(config.catalog_path, PathBuf::from("tasks.json"));
        assert_eq!(config.db_path, "db.sqlite");
    }

    #[test]
    fn reads_overrides() {
        let config = config(&[
            ("OPERATOR_ID", " 123456 "),
            ("CATALOG_PATH", "/data/ege.json"),
            ("DB_PATH", "/data/users.sqlite"),
        ]);
        assert_eq!(config.operator, Some(UserId(123456)));
        assert_eq!(config.catalog_path, PathBuf::from("/data/ege.json"));
        assert_eq!(config.db_path, "/data/users.sqlite");
    }

    #[test]
    fn non_numeric_operator_is_ignored() {
        assert_eq!(config(&[("OPERATOR_ID", "@admin")]).operator, None);
    }
}
