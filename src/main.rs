use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{arg, crate_description, crate_version, value_parser, ArgMatches, Command};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mirror_tools::command::SystemRunner;
use mirror_tools::config::Config;
use mirror_tools::schedule::{Clock, SystemClock};
use mirror_tools::status::StatusStore;
use mirror_tools::{repo_status, updater, wireguard};

fn cli() -> Command {
    let tree_args = [
        arg!(--root <DIR> "Directory tree to search for repositories")
            .required(false)
            .value_parser(value_parser!(PathBuf)),
        arg!(--"status-file" <FILE> "Where last-update timestamps are kept")
            .required(false)
            .value_parser(value_parser!(PathBuf)),
        arg!(--cooldown <SECONDS> "Minimum time between updates of one repository")
            .required(false)
            .value_parser(value_parser!(u64)),
    ];

    Command::new("mirror")
        .about(crate_description!())
        .version(crate_version!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            arg!(-c --config <FILE> "Config file to use instead of the default")
                .required(false)
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .subcommand(
            Command::new("update")
                .about("Run `git remote update` in every repository whose cooldown has expired")
                .args(tree_args.clone())
                .arg(
                    arg!(--delay <SECONDS> "Pause between consecutive updates")
                        .required(false)
                        .value_parser(value_parser!(u64)),
                ),
        )
        .subcommand(
            Command::new("status")
                .about("Show when each repository was last updated and whether it is due")
                .args(tree_args),
        )
        .subcommand(
            Command::new("endpoints")
                .about("Print the unique IP addresses of all WireGuard peer endpoints"),
        )
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<Config> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => Config::load_file(path)?,
        None => Config::load()?,
    };

    if let Some(root) = matches.try_get_one::<PathBuf>("root").ok().flatten() {
        config.root = Some(root.clone());
    }
    if let Some(file) = matches.try_get_one::<PathBuf>("status-file").ok().flatten() {
        config.status_file = Some(file.clone());
    }
    if let Some(secs) = matches.try_get_one::<u64>("cooldown").ok().flatten() {
        config.cooldown_secs = *secs;
    }
    if let Some(secs) = matches.try_get_one::<u64>("delay").ok().flatten() {
        config.delay_secs = *secs;
    }
    Ok(config)
}

fn init_logging() {
    let env_filter =
        EnvFilter::try_from_env("MIRROR_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let matches = cli().get_matches();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match matches.subcommand() {
        Some(("update", arg_matches)) => {
            let config = load_config(arg_matches)?;
            updater::run_update(&config, &SystemRunner, &SystemClock, &mut out)
                .context("mirror update run failed")?;
        }
        Some(("status", arg_matches)) => {
            let config = load_config(arg_matches)?;
            let root = config.resolve_root()?;
            let store = StatusStore::load(&config.resolve_status_file(&root))?;
            let statuses = repo_status::collect(
                &root,
                &config.repo_suffix,
                config.max_depth,
                &config.schedule(),
                &store,
                SystemClock.now(),
            );
            repo_status::print_summary(&root, &statuses, &mut out)?;
        }
        Some(("endpoints", arg_matches)) => {
            let config = load_config(arg_matches)?;
            let here = std::env::current_dir().context("unable to determine working directory")?;
            let addresses =
                wireguard::peer_addresses(&config.endpoints_command, &SystemRunner, &here)?;
            for address in addresses {
                writeln!(out, "{address}")?;
            }
        }
        _ => unreachable!(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        cli().debug_assert();
    }

    #[test]
    fn flags_override_config() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "cooldown_secs = 5\ndelay_secs = 7\n").unwrap();

        let matches = cli()
            .try_get_matches_from([
                "mirror",
                "update",
                "--config",
                config_path.to_str().unwrap(),
                "--root",
                "/srv/mirrors",
                "--cooldown",
                "60",
            ])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        let config = load_config(sub).unwrap();

        assert_eq!(config.root, Some(PathBuf::from("/srv/mirrors")));
        assert_eq!(config.cooldown_secs, 60);
        assert_eq!(config.delay_secs, 7);
        assert_eq!(config.status_file, None);
    }

    #[test]
    fn status_ignores_update_only_flags() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "").unwrap();

        let matches = cli()
            .try_get_matches_from(["mirror", "status", "-c", config_path.to_str().unwrap()])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "status");
        assert_eq!(load_config(sub).unwrap(), Config::empty());
    }
}
