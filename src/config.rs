use std::{env, path::PathBuf};

const DEFAULT_GITHUB_API: &str = "https://api.github.com";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is not a valid value: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("GITHUB_REPO must be set for the github backend")]
    MissingRepo,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendConfig {
    GitHub {
        api_base: String,
        repo: String,
        path: String,
        branch: String,
        token: Option<String>,
    },
    File {
        path: PathBuf,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub backend: BackendConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok().filter(|value| !value.is_empty()))
    }

    /// Builds the config from any variable source; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match lookup("PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value,
            })?,
            None => 8080,
        };

        let repo = lookup("GITHUB_REPO");
        let backend_name = lookup("DIARY_BACKEND").unwrap_or_else(|| {
            if repo.is_some() { "github" } else { "file" }.to_string()
        });

        let backend = match backend_name.as_str() {
            "github" => BackendConfig::GitHub {
                api_base: lookup("GITHUB_API_URL")
                    .unwrap_or_else(|| DEFAULT_GITHUB_API.into())
                    .trim_end_matches('/')
                    .to_string(),
                repo: repo.ok_or(ConfigError::MissingRepo)?,
                path: lookup("GITHUB_FILE_PATH").unwrap_or_else(|| "diary.json".into()),
                branch: lookup("GITHUB_BRANCH").unwrap_or_else(|| "main".into()),
                token: lookup("GITHUB_TOKEN"),
            },
            "file" => BackendConfig::File {
                path: PathBuf::from(
                    lookup("DIARY_DATA_PATH").unwrap_or_else(|| "data/diary.json".into()),
                ),
            },
            _ => {
                return Err(ConfigError::Invalid {
                    name: "DIARY_BACKEND",
                    value: backend_name,
                });
            }
        };

        Ok(Self {
            host,
            port,
            backend,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_to_local_file_backend() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.backend,
            BackendConfig::File {
                path: PathBuf::from("data/diary.json")
            }
        );
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn repo_selects_github_backend() {
        let config = config_from(&[
            ("GITHUB_REPO", "someone/diary"),
            ("GITHUB_TOKEN", "secret"),
            ("GITHUB_API_URL", "http://localhost:9000/"),
        ])
        .unwrap();
        match config.backend {
            BackendConfig::GitHub {
                api_base,
                repo,
                path,
                branch,
                token,
            } => {
                assert_eq!(api_base, "http://localhost:9000");
                assert_eq!(repo, "someone/diary");
                assert_eq!(path, "diary.json");
                assert_eq!(branch, "main");
                assert_eq!(token.as_deref(), Some("secret"));
            }
            other => panic!("unexpected backend {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_port_and_backend() {
        assert!(matches!(
            config_from(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
        assert!(matches!(
            config_from(&[("DIARY_BACKEND", "s3")]),
            Err(ConfigError::Invalid {
                name: "DIARY_BACKEND",
                ..
            })
        ));
        assert!(matches!(
            config_from(&[("DIARY_BACKEND", "github")]),
            Err(ConfigError::MissingRepo)
        ));
    }
}
