use log::{error, info};

use profile_base::config::ProfileConfig;
use profile_base::custom_error::CustomResult;
use profile_base::ds::DatasetManifest;

use crate::cli::{parse_args, Command};
use crate::node::{feature_summary, load_profile, summary, Node};

mod cli;
mod node;

#[tokio::main]
async fn main() {
    env_logger::init();

    // 参数错误时 clap 打印用法并退出
    let cli = parse_args(std::env::args_os()).unwrap_or_else(|e| e.exit());
    if let Err(e) = run(cli.command).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command) -> CustomResult<()> {
    match command {
        Command::Profile { manifest, rows, out, config } => {
            let config = match config {
                Some(path) => ProfileConfig::load(path)?,
                None => ProfileConfig::default(),
            };
            let node = Node {
                config,
                manifest: DatasetManifest::load(manifest)?,
            };
            let profile = node.profile_file(&rows, &out).await?;
            profile.validate_against(&node.manifest)?;
            info!("profiled {} features", profile.len());
        }
        Command::Inspect { profile, feature } => {
            let profile = load_profile(&profile).await?;
            match feature {
                Some(name) => {
                    let feature = profile.get_feature(&name)?;
                    println!("{:#}", feature_summary(&name, feature));
                }
                None => println!("{:#}", summary(&profile)),
            }
        }
    }
    Ok(())
}
