//! Argument parsing and dispatch for the dbtuner CLI.
//!
//! ## What
//!
//! - [`GlobalArgs`] holds the options that apply to every sub-command (environment, logging).
//! - [`parse_from`] builds the clap command tree from the registered [`SubCommand`]s and
//!   parses argv. The configured environments are listed at the end of `--help`.
//! - [`dispatch`] resolves the selected sub-command and runs it.
//!
//! ## How
//!
//! ```sh
//! dbtuner -c dev archive -st orders -tt orders_backup --date_condition 20200101
//! ```
use crate::commands::{CommandContext, SubCommand};
use crate::config::{Context, EnvironmentRegistry};
use crate::connection::CredentialStrategy;
use crate::error::{Error, Result};
use crate::store::Connector;
use clap::{ArgMatches, Command, CommandFactory, FromArgMatches, Parser};
use std::ffi::OsString;
use std::io::Write;

/// Single-dash, two-letter flags accepted for compatibility, and the long flag each stands for.
const LEGACY_FLAGS: &[(&str, &str)] = &[("-st", "--source_table"), ("-tt", "--target_table")];

/// Options shared by all sub-commands.
#[derive(Parser, Debug, Clone)]
#[command(name = "dbtuner")]
#[command(about = "Database maintenance operations: periodic archival to backup tables")]
#[command(version)]
#[command(override_usage = "dbtuner [OPTIONS] <SUBCOMMAND> [SUBCOMMAND_OPTIONS | --help]")]
pub struct GlobalArgs {
    /// Environment to run against
    #[arg(long, short = 'c', value_enum, default_value_t = Context::Dev)]
    pub context: Context,

    /// Log destination: stderr or file path
    #[arg(long, default_value = "stderr")]
    pub log_dest: String,

    /// Log level: error, warn, info, debug, trace
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Parsed command line: global options plus the selected sub-command and its matches.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub global: GlobalArgs,
    pub command: String,
    pub matches: ArgMatches,
}

/// Rewrite legacy single-dash flags (`-st`, `-tt`) to their long forms.
///
/// clap treats `-st` as `-s` followed by `t`, so these are translated before parsing.
/// Both `-st value` and `-st=value` are handled. Everything after `--` is left alone.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut passthrough = false;
    args.into_iter()
        .map(|arg| {
            let arg: OsString = arg.into();
            if passthrough {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                passthrough = true;
                return arg;
            }
            for (short, long) in LEGACY_FLAGS {
                if text == *short {
                    return OsString::from(*long);
                }
                let value = text
                    .strip_prefix(*short)
                    .and_then(|rest| rest.strip_prefix('='));
                if let Some(value) = value {
                    return OsString::from(format!("{}={}", long, value));
                }
            }
            arg
        })
        .collect()
}

/// Text shown after the option list of `--help`: configured environments and login notes.
fn environments_help(registry: &EnvironmentRegistry) -> String {
    let mut help = String::from("Configured environments:\n");
    for (context, env) in registry.entries() {
        help.push_str(&format!(
            "  {:<6} server {}, database {}, schema {}\n",
            context.to_string(),
            env.server,
            env.database,
            env.schema
        ));
    }
    help.push_str(
        "\nSessions log in with integrated authentication as the current user. Builds for \
         platforms other than Windows need the `integrated-auth-gssapi` feature.",
    );
    help
}

/// Build the full clap command with every registered sub-command attached.
///
/// The help string declared by each sub-command is applied last so argument derives cannot
/// replace it.
pub fn build_command(
    commands: &[Box<dyn SubCommand>],
    registry: &EnvironmentRegistry,
) -> Command {
    commands.iter().fold(
        GlobalArgs::command()
            .subcommand_required(true)
            .arg_required_else_help(true)
            .after_help(environments_help(registry)),
        |root, sub| {
            let command = sub.args(Command::new(sub.name())).about(sub.help());
            root.subcommand(command)
        },
    )
}

/// Parse `args` (including the program name) against the registered sub-commands.
///
/// Errors are clap errors so the caller can let clap print usage and pick the exit code.
pub fn parse_from<I, T>(
    commands: &[Box<dyn SubCommand>],
    registry: &EnvironmentRegistry,
    args: I,
) -> std::result::Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut root = build_command(commands, registry);
    let matches = root.try_get_matches_from_mut(normalize_args(args))?;
    let global = GlobalArgs::from_arg_matches(&matches)?;

    let (name, sub_matches) = matches.subcommand().ok_or_else(|| {
        root.error(
            clap::error::ErrorKind::MissingSubcommand,
            "a sub-command is required",
        )
    })?;

    Ok(Invocation {
        global,
        command: name.to_string(),
        matches: sub_matches.clone(),
    })
}

/// Run the sub-command selected in `invocation`.
///
/// # Arguments
/// * `commands` - Registered sub-commands
/// * `invocation` - Parsed command line
/// * `registry` - Environment registry
/// * `connector` - Opens database sessions
/// * `credential` - Authentication used for every session
/// * `out` - Operator-facing output
pub async fn dispatch(
    commands: &[Box<dyn SubCommand>],
    invocation: &Invocation,
    registry: &EnvironmentRegistry,
    connector: &dyn Connector,
    credential: &dyn CredentialStrategy,
    out: &mut (dyn Write + Send),
) -> Result<()> {
    let command = commands
        .iter()
        .find(|c| c.name() == invocation.command)
        .ok_or_else(|| Error::UnknownCommand {
            name: invocation.command.clone(),
        })?;

    let ctx = CommandContext {
        context: invocation.global.context,
        registry,
        connector,
        credential,
    };

    tracing::debug!(
        "Running '{}' against environment '{}'",
        command.name(),
        ctx.context
    );
    command.execute(&ctx, &invocation.matches, out).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::registry;
    use clap::error::ErrorKind;

    const ARCHIVE_ARGS: [&str; 8] = [
        "dbtuner",
        "archive",
        "-st",
        "orders",
        "-tt",
        "orders_backup",
        "--date_condition",
        "20200101",
    ];

    fn builtin() -> EnvironmentRegistry {
        EnvironmentRegistry::builtin().unwrap()
    }

    fn parse<I, T>(args: I) -> std::result::Result<Invocation, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        parse_from(&registry(), &builtin(), args)
    }

    fn as_strs(args: &[OsString]) -> Vec<&str> {
        args.iter().map(|a| a.to_str().unwrap()).collect()
    }

    #[test]
    fn test_normalize_legacy_flags() {
        let args = normalize_args([
            "dbtuner",
            "archive",
            "-st",
            "a",
            "-tt=b",
            "--date_condition",
            "1",
        ]);
        assert_eq!(
            as_strs(&args),
            vec![
                "dbtuner",
                "archive",
                "--source_table",
                "a",
                "--target_table=b",
                "--date_condition",
                "1"
            ]
        );
    }

    #[test]
    fn test_normalize_stops_after_separator() {
        let args = normalize_args(["dbtuner", "--", "-st"]);
        assert_eq!(args.last().unwrap(), "-st");
    }

    #[test]
    fn test_normalize_leaves_other_flags() {
        let args = normalize_args(["dbtuner", "-c", "dev", "-stx"]);
        assert_eq!(as_strs(&args), vec!["dbtuner", "-c", "dev", "-stx"]);
    }

    #[test]
    fn test_parse_archive_defaults_to_dev() {
        let invocation = parse(ARCHIVE_ARGS).unwrap();

        assert_eq!(invocation.command, "archive");
        assert_eq!(invocation.global.context, Context::Dev);
        assert_eq!(invocation.global.log_level, "info");
        assert_eq!(
            invocation.matches.get_one::<String>("source_table").unwrap(),
            "orders"
        );
    }

    #[test]
    fn test_parse_long_flag_spellings() {
        let invocation = parse([
            "dbtuner",
            "-c",
            "prod",
            "archive",
            "--source-table",
            "a",
            "--target_table",
            "b",
            "--date-condition",
            "c",
        ])
        .unwrap();

        assert_eq!(invocation.global.context, Context::Prod);
        assert_eq!(invocation.matches.get_one::<String>("target_table").unwrap(), "b");
        assert_eq!(invocation.matches.get_one::<String>("date_condition").unwrap(), "c");
    }

    #[test]
    fn test_parse_missing_required_arguments() {
        for skipped in [2usize, 4, 6] {
            let args: Vec<&str> = ARCHIVE_ARGS
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != skipped && *i != skipped + 1)
                .map(|(_, a)| *a)
                .collect();

            let err = parse(args).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn test_parse_unknown_context_rejected() {
        let mut args = vec!["dbtuner", "-c", "staging"];
        args.extend_from_slice(&ARCHIVE_ARGS[1..]);

        let err = parse(args).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn test_parse_without_subcommand() {
        let err = parse(["dbtuner"]).unwrap_err();
        assert_eq!(
            err.kind(),
            ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
        assert_ne!(err.exit_code(), 0);
    }

    #[test]
    fn test_every_registered_command_is_attached() {
        let commands = registry();
        let root = build_command(&commands, &builtin());
        for command in &commands {
            assert!(
                root.find_subcommand(command.name()).is_some(),
                "{} not attached",
                command.name()
            );
        }
    }

    #[test]
    fn test_subcommand_about_is_declared_help() {
        let commands = registry();
        let root = build_command(&commands, &builtin());
        for command in &commands {
            let attached = root.find_subcommand(command.name()).unwrap();
            let about = attached.get_about().map(|about| about.to_string());
            assert_eq!(about.as_deref(), Some(command.help()));
        }
    }

    #[test]
    fn test_help_lists_configured_environments() {
        let help = build_command(&registry(), &builtin())
            .render_help()
            .to_string();

        assert!(help.contains("Configured environments:"));
        assert!(help.contains("dev    server localhost, database dev_db, schema dev_schema"));
        assert!(help.contains("integrated-auth-gssapi"));
        assert!(!help.contains("prod    server"));
    }
}
