//! Kill command - terminate processes with taskkill.

use anyhow::Result;
use wincmd_core::{
    CommandSpec, Password, RemoteSystem, TaskkillOptions, TaskkillService, UserContext,
};

use crate::KillArgs;

fn options(args: KillArgs) -> TaskkillOptions {
    let mut options = TaskkillOptions::new().force(args.force).tree(args.tree);

    if let Some(system) = args.system {
        let mut remote = RemoteSystem::new(system);
        if let Some(user) = args.user {
            let password = match (args.password, args.prompt_password) {
                (Some(password), _) => Password::Given(password),
                (None, true) => Password::Prompt,
                (None, false) => Password::None,
            };
            let mut context = UserContext::new(user).with_password(password);
            if let Some(domain) = args.domain {
                context = context.with_domain(domain);
            }
            remote = remote.with_user(context);
        }
        options = options.remote(remote);
    }

    for filter in args.filters {
        options = options.filter(filter);
    }
    for pid in args.pids {
        options = options.pid(pid);
    }
    for image in args.images {
        options = options.image(image);
    }
    options
}

pub async fn run(args: KillArgs, timeout: Option<u64>) -> Result<()> {
    let dry_run = args.dry_run;
    let options = options(args);

    if dry_run {
        super::print_dry_run(&options.command_line()?);
        return Ok(());
    }

    let service = TaskkillService::new(super::runner(timeout).await);
    let report = service.kill(&options).await?;
    super::print_report(&report);
    Ok(())
}
