use color_eyre::Result;
use serde_json::json;
use wheelhouse_core::{
    build_mirror, resolve_packages, CommandContext, CommandGroup, CommandInfo, ExecutionOutcome,
    MirrorRequest, ResolveRequest, UserError,
};

use crate::cli::{CommandGroupCli, TargetArgs};

pub fn command_info(group: &CommandGroupCli) -> CommandInfo {
    match group {
        CommandGroupCli::Resolve(_) => CommandInfo::new(CommandGroup::Resolve, "resolve"),
        CommandGroupCli::Mirror(_) => CommandInfo::new(CommandGroup::Mirror, "mirror"),
    }
}

pub fn dispatch_command(
    ctx: &CommandContext,
    group: &CommandGroupCli,
) -> Result<(CommandInfo, ExecutionOutcome)> {
    let info = command_info(group);
    match group {
        CommandGroupCli::Resolve(args) => {
            let request = resolve_request_from_args(&args.target);
            core_call(info, || resolve_packages(ctx, &request))
        }
        CommandGroupCli::Mirror(args) => {
            let request = MirrorRequest {
                resolve: resolve_request_from_args(&args.target),
                output: args.output.clone(),
                dry_run: args.dry_run,
            };
            core_call(info, || build_mirror(ctx, &request))
        }
    }
}

/// Outcome for a run that could not even build its command context.
pub fn context_failure_outcome(err: &anyhow::Error) -> ExecutionOutcome {
    UserError::new(
        "invalid_config",
        format!("invalid configuration: {err}"),
        json!({
            "error": err.to_string(),
            "hint": "Check the WHEELHOUSE_* environment variables.",
        }),
    )
    .into_outcome()
}

fn resolve_request_from_args(args: &TargetArgs) -> ResolveRequest {
    ResolveRequest {
        platform: args.platform.clone(),
        python: args.python.clone(),
        implementation: args.implementation.clone(),
        packages: args.packages.clone(),
        wishlist: args.wishlist.clone(),
    }
}

fn core_call<F>(info: CommandInfo, action: F) -> Result<(CommandInfo, ExecutionOutcome)>
where
    F: FnOnce() -> anyhow::Result<ExecutionOutcome>,
{
    match action() {
        Ok(result) => Ok((info, result)),
        Err(err) => match err.downcast::<UserError>() {
            Ok(user) => Ok((info, user.into_outcome())),
            Err(err) => {
                let issues: Vec<String> =
                    err.chain().map(std::string::ToString::to_string).collect();
                Ok((
                    info,
                    ExecutionOutcome::failure(
                        err.to_string(),
                        json!({
                            "reason": "internal_error",
                            "error": err.to_string(),
                            "issues": issues,
                            "hint": "Re-run with `-v` or `--trace` for more detail.",
                        }),
                    ),
                ))
            }
        },
    }
}
