//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// linktracker - trackable short links with click analytics
#[derive(Parser, Debug)]
#[command(name = "linktracker")]
#[command(version)]
#[command(about = "Trackable short links with click analytics", long_about = None)]
pub struct Cli {
    /// 配置文件路径（默认 config.toml）
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Write a sample configuration file
    GenerateConfig {
        /// Output path (default: stdout)
        output_path: Option<String>,
    },

    /// Issue an access token signed with the configured secret
    ///
    /// 用于本地调试；生产环境的令牌由外部身份服务签发
    IssueToken {
        /// Subject (user id)
        #[arg(long)]
        user: String,

        #[arg(long)]
        email: Option<String>,

        /// Lifetime in minutes
        #[arg(long, default_value_t = 60)]
        minutes: i64,
    },
}

impl Cli {
    /// 未指定子命令时运行服务器
    pub fn command(&self) -> &Commands {
        self.command.as_ref().unwrap_or(&Commands::Serve)
    }
}
