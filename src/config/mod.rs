// Configuration module entry point
// Loads layered settings and owns the shared application state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, DevServerConfig, StaticFilesConfig};

/// Default config file, looked up without extension
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Environment variables use the `ZXCEL` prefix, e.g. `ZXCEL__SERVER__PORT=9000`
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("ZXCEL")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("static_files.index_files")
                    .with_list_parse_key("dev_server.args")
                    .try_parsing(true),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "zxcel-back")?
            .set_default("http.enable_cors", false)?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .set_default("static_files.root", "../build")?
            .set_default("static_files.index_files", vec!["index.html"])?
            .set_default("health.enabled", true)?
            .set_default("health.path", "/healthz")?
            .set_default("dev_server.program", "npm")?
            .set_default("dev_server.args", vec!["start"])?
            .set_default("dev_server.working_dir", "..")?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load_from("definitely/not/a/config/file").unwrap();
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.static_files.root, "../build");
        assert_eq!(cfg.static_files.index_files, vec!["index.html".to_string()]);
        assert_eq!(cfg.dev_server.program, "npm");
        assert_eq!(cfg.dev_server.args, vec!["start".to_string()]);
        assert_eq!(cfg.dev_server.working_dir, "..");
        assert_eq!(cfg.http.max_body_size, 10_485_760);
        assert!(cfg.health.enabled);
        assert_eq!(cfg.logging.access_log_format, "combined");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 9100

[static_files]
root = "dist"
index_files = ["index.html", "index.htm"]

[dev_server]
program = "yarn"
args = ["dev"]
working_dir = "frontend"
"#,
        )
        .unwrap();

        let base = path.with_extension("");
        let cfg = Config::load_from(base.to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.static_files.root, "dist");
        assert_eq!(cfg.static_files.index_files.len(), 2);
        assert_eq!(cfg.dev_server.program, "yarn");
        assert_eq!(cfg.dev_server.working_dir, "frontend");
    }

    #[test]
    fn test_socket_addr() {
        let mut cfg = Config::load_from("definitely/not/a/config/file").unwrap();
        assert_eq!(
            cfg.get_socket_addr().unwrap(),
            "127.0.0.1:5000".parse::<SocketAddr>().unwrap()
        );

        cfg.server.host = "not a host".to_string();
        assert!(cfg.get_socket_addr().is_err());
    }
}
