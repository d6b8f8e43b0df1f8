//! Shutdown command - power actions.

use anyhow::Result;
use wincmd_core::{CommandSpec, ShutdownOptions, ShutdownService};

use crate::ShutdownArgs;

pub async fn run(args: ShutdownArgs, timeout: Option<u64>) -> Result<()> {
    let mut options = ShutdownOptions::new(args.action.into())
        .with_force(args.force)
        .with_firmware(args.firmware)
        .with_advanced_boot(args.advanced_boot);
    if let Some(delay) = args.delay {
        options = options.with_timeout(delay);
    }
    if let Some(comment) = args.comment {
        options = options.with_comment(comment);
    }
    if let Some(reason) = args.reason {
        options = options.with_reason(reason);
    }
    if let Some(remote) = args.remote {
        options = options.with_remote(remote);
    }

    if args.dry_run {
        super::print_dry_run(&options.command_line()?);
        return Ok(());
    }

    let service = ShutdownService::new(super::runner(timeout).await);
    let output = service.execute(&options).await?;
    super::print_report(&output);
    Ok(())
}
