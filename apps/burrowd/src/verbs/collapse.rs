use crate::dispatch::{Ctx, split_args};

pub fn execute(ctx: &mut Ctx<'_>, args: &str) {
    let Some(here) = ctx.here_room() else {
        ctx.tell("There is nothing to collapse here.");
        return;
    };
    let args = split_args(args, 1);
    let Some(&dir) = args.first() else {
        ctx.tell("Collapse what?");
        return;
    };

    let keys: Vec<String> = ctx
        .world
        .room(here)
        .map(|r| r.exit_keys().into_iter().map(str::to_owned).collect())
        .unwrap_or_default();
    let Some(i) = ctx.match_input(dir, &keys) else {
        return;
    };

    match ctx.world.room_mut(here).map(|r| r.remove_exit(&keys[i])) {
        Some(Ok(exit)) => {
            ctx.tell(&format!("The way {} collapses.", exit.key));
            ctx.tell_room(here, Some(ctx.player), "Something is changed.");
        }
        Some(Err(e)) => ctx.refuse(&format!("Nothing happens: {e}.")),
        None => {}
    }
}
