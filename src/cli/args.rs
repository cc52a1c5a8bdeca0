use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::config::AuthMode;

/// Run a remote development server.
#[derive(Parser, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[command(name = "dev-server", disable_version_flag = true)]
pub struct Cli {
    /// The type of authentication to use.
    #[arg(long, value_enum, value_name = "TYPE")]
    pub auth: Option<AuthMode>,

    /// Host to bind the HTTP server to.
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind the HTTP server to.
    #[arg(long)]
    pub port: Option<u16>,

    /// Path to a Unix socket; overrides host and port.
    #[arg(long, value_name = "PATH")]
    pub socket: Option<PathBuf>,

    /// Path to a certificate. Without a value a self-signed one is generated.
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    #[serde(default, skip_serializing_if = "Option::is_none", with = "optional_value")]
    pub cert: Option<Option<PathBuf>>,

    /// Path to the certificate's private key.
    #[arg(long, value_name = "PATH")]
    pub cert_key: Option<PathBuf>,

    /// SSH host key. Generated under the user data dir when omitted.
    #[arg(long, value_name = "PATH")]
    pub ssh_host_key: Option<PathBuf>,

    /// Do not start the SSH server.
    #[arg(long)]
    pub disable_ssh: bool,

    /// Disable update checking.
    #[arg(long)]
    pub disable_updates: bool,

    /// Open in the browser on startup. Does not work remotely.
    #[arg(long)]
    pub open: bool,

    /// Display version information.
    #[arg(short = 'v', long)]
    pub version: bool,

    /// Print version information as JSON.
    #[arg(long, requires = "version")]
    pub json: bool,

    /// Path to a TOML config file.
    #[arg(long, value_name = "PATH", env = "DEV_SERVER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding generated certificates, keys and static files.
    #[arg(long, value_name = "PATH")]
    pub user_data_dir: Option<PathBuf>,

    /// Directory holding installed extensions.
    #[arg(long, value_name = "PATH")]
    pub extensions_dir: Option<PathBuf>,

    /// List installed extensions.
    #[arg(long)]
    pub list_extensions: bool,

    /// Show extension versions with --list-extensions.
    #[arg(long, requires = "list_extensions")]
    pub show_versions: bool,

    /// Install an extension from a local directory.
    #[arg(long, value_name = "ID|PATH")]
    pub install_extension: Vec<String>,

    /// Uninstall an extension by id.
    #[arg(long, value_name = "ID")]
    pub uninstall_extension: Vec<String>,

    /// Log level: trace, debug, info, warn or error.
    #[arg(long, value_name = "LEVEL")]
    pub log: Option<String>,
}

impl Cli {
    /// Invocations that are relayed to a worker instead of starting the server.
    pub fn is_extension_command(&self) -> bool {
        self.list_extensions
            || !self.install_extension.is_empty()
            || !self.uninstall_extension.is_empty()
    }

    /// True when `--cert` was passed, with or without a value.
    pub fn cert_requested(&self) -> bool {
        self.cert.is_some()
    }

    pub fn user_data_dir(&self) -> PathBuf {
        self.user_data_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|dir| dir.join("dev-server"))
                .unwrap_or_else(|| PathBuf::from(".dev-server"))
        })
    }

    pub fn extensions_dir(&self) -> PathBuf {
        self.extensions_dir
            .clone()
            .unwrap_or_else(|| self.user_data_dir().join("extensions"))
    }

    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| self.user_data_dir().join("config.toml"))
    }
}

/// Serde for `--cert`, keeping "flag without value" distinct from "absent".
mod optional_value {
    use std::path::PathBuf;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Option<PathBuf>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Option<PathBuf>>, D::Error> {
        Option::<PathBuf>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["dev-server"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn cert_flag_forms() {
        assert_eq!(parse(&[]).cert, None);
        assert_eq!(parse(&["--cert"]).cert, Some(None));
        assert_eq!(
            parse(&["--cert", "/tmp/a.crt"]).cert,
            Some(Some(PathBuf::from("/tmp/a.crt")))
        );
        assert_eq!(parse(&["--cert", "--port", "9000"]).cert, Some(None));
    }

    #[test]
    fn extension_flags_select_delegation() {
        assert!(!parse(&[]).is_extension_command());
        assert!(parse(&["--list-extensions"]).is_extension_command());
        assert!(parse(&["--install-extension", "./ext"]).is_extension_command());
        assert!(parse(&["--uninstall-extension", "a.b"]).is_extension_command());
    }

    #[test]
    fn json_requires_version() {
        assert!(Cli::try_parse_from(["dev-server", "--json"]).is_err());
        let cli = parse(&["--version", "--json"]);
        assert!(cli.version && cli.json);
    }

    #[test]
    fn auth_values() {
        assert_eq!(parse(&["--auth", "none"]).auth, Some(AuthMode::None));
        assert_eq!(parse(&["--auth", "password"]).auth, Some(AuthMode::Password));
        assert!(Cli::try_parse_from(["dev-server", "--auth", "token"]).is_err());
    }

    #[test]
    fn cert_survives_serde() {
        for cli in [parse(&[]), parse(&["--cert"]), parse(&["--cert", "x.pem"])] {
            let json = serde_json::to_string(&cli).unwrap();
            let back: Cli = serde_json::from_str(&json).unwrap();
            assert_eq!(back.cert, cli.cert);
        }
    }

    #[test]
    fn directories_derive_from_user_data_dir() {
        let cli = parse(&["--user-data-dir", "/data"]);
        assert_eq!(cli.extensions_dir(), PathBuf::from("/data/extensions"));
        assert_eq!(cli.user_data_dir(), PathBuf::from("/data"));
    }
}
