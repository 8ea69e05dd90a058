use crate::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "texsync")]
#[command(about = "SyncTeX forward and backward search between editors and PDF viewers", long_about = None)]
pub struct Cli {
    /// Emit log lines as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serve the HTTP and WebSocket endpoints
    Serve {
        /// Document viewers are registered for when they do not name one
        pdf: Option<PathBuf>,
        #[arg(short, long)]
        port: Option<u16>,
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Print the page position of a source line
    Forward {
        #[arg(short, long)]
        line: u32,
        #[arg(short, long)]
        tex: PathBuf,
        pdf: PathBuf,
    },
    /// Print the source line under a page position
    Backward {
        #[arg(short, long)]
        page: u32,
        #[arg(short, long, allow_negative_numbers = true)]
        x: f64,
        #[arg(short, long, allow_negative_numbers = true)]
        y: f64,
        pdf: PathBuf,
    },
}

impl Commands {
    /// Overlay the flags of `serve` on a loaded config.
    pub fn apply_overrides(&self, mut config: Config) -> Config {
        if let Self::Serve {
            pdf, port, host, ..
        } = self
        {
            if let Some(pdf) = pdf {
                config.document = Some(pdf.clone());
            }
            if let Some(port) = port {
                config.port = *port;
            }
            if let Some(host) = host {
                config.host.clone_from(host);
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};

    #[test]
    fn test_serve_flags_override_config() {
        let cli = Cli::try_parse_from(["texsync", "serve", "/work/doc.pdf", "--port", "9000"]).unwrap();
        let config = cli.command.apply_overrides(Config::default());
        check!(config.port == 9000);
        check!(config.host == "127.0.0.1");
        check!(config.document == Some(PathBuf::from("/work/doc.pdf")));
    }

    #[test]
    fn test_serve_without_flags_keeps_config() {
        let cli = Cli::try_parse_from(["texsync", "serve"]).unwrap();
        let config = Config {
            port: 1234,
            ..Config::default()
        };
        check!(cli.command.apply_overrides(config.clone()) == config);
    }

    #[test]
    fn test_backward_arguments() {
        let cli = Cli::try_parse_from([
            "texsync", "backward", "--page", "2", "-x", "105.5", "-y", "-3", "doc.pdf",
        ])
        .unwrap();
        let_assert!(Commands::Backward { page, x, y, pdf } = cli.command);
        check!(page == 2);
        check!(x == 105.5);
        check!(y == -3.0);
        check!(pdf == PathBuf::from("doc.pdf"));
    }

    #[test]
    fn test_forward_requires_line() {
        check!(Cli::try_parse_from(["texsync", "forward", "--tex", "a.tex", "doc.pdf"]).is_err());
    }
}
