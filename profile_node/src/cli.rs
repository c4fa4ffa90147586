use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// 计算数据集 profile，或者查看已经写出的 profile
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "profile_node")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// 按数据集描述读取 json lines 数据，写出编码后的 profile
    Profile {
        /// 数据集描述文件（json）
        manifest: PathBuf,
        /// json lines 格式的数据
        rows: PathBuf,
        /// profile 输出路径
        out: PathBuf,
        /// profile 配置文件（json），不指定时用默认配置
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// 打印 profile 摘要，指定特征名时只打印该特征
    Inspect {
        profile: PathBuf,
        feature: Option<String>,
    },
}

pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
    where I: IntoIterator<Item=T>, T: Into<std::ffi::OsString> + Clone {
    Cli::try_parse_from(args)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::cli::{parse_args, Command};

    #[test]
    pub fn test_parse_profile() {
        let cli = parse_args(["profile_node", "profile", "higgs.json", "rows.jsonl", "out.bin"]).unwrap();
        assert_eq!(cli.command, Command::Profile {
            manifest: PathBuf::from("higgs.json"),
            rows: PathBuf::from("rows.jsonl"),
            out: PathBuf::from("out.bin"),
            config: None,
        });

        let cli = parse_args(["profile_node", "profile", "m.json", "r.jsonl", "o.bin", "--config", "c.json"]).unwrap();
        match cli.command {
            Command::Profile { config, .. } => assert_eq!(config, Some(PathBuf::from("c.json"))),
            other => panic!("期望 profile 命令, 实际:{:?}", other),
        }
    }

    #[test]
    pub fn test_parse_inspect() {
        let cli = parse_args(["profile_node", "inspect", "out.bin"]).unwrap();
        assert_eq!(cli.command, Command::Inspect { profile: PathBuf::from("out.bin"), feature: None });

        let cli = parse_args(["profile_node", "inspect", "out.bin", "label"]).unwrap();
        assert_eq!(cli.command, Command::Inspect {
            profile: PathBuf::from("out.bin"),
            feature: Some("label".to_string()),
        });
    }

    #[test]
    pub fn test_parse_invalid() {
        assert!(parse_args(["profile_node"]).is_err());
        assert!(parse_args(["profile_node", "profile", "m.json"]).is_err());
        assert!(parse_args(["profile_node", "inspect", "a", "b", "c"]).is_err());
        assert!(parse_args(["profile_node", "merge", "a"]).is_err());
    }
}
