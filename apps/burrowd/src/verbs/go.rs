use crate::dispatch::{Ctx, split_args};

use super::look::show_exits;

pub fn execute(ctx: &mut Ctx<'_>, args: &str) {
    let Some(here) = ctx.here_room() else {
        ctx.tell("You cannot go anywhere here.");
        return;
    };
    let args = split_args(args, 1);
    let Some(&dir) = args.first() else {
        ctx.tell("Go where?");
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
    let dir = &keys[i];

    let Some(exit) = ctx.world.room(here).and_then(|r| r.exit(dir)).cloned() else {
        ctx.refuse("Cannot go that way here.");
        return;
    };
    let dest = ctx.world.find(&exit.target);
    let prev = ctx.world.key(here).cloned();
    let who = ctx.key_of(ctx.player);

    if let Some(travel) = &exit.travel {
        ctx.tell(&format!("{travel}  "));
    }
    ctx.tell_room(here, Some(ctx.player), &format!("{who} leaves to {dir}."));
    if !ctx.world.reparent(ctx.player, Some(dest)) {
        ctx.refuse("The way is blocked.");
        return;
    }
    ctx.tell_room(dest, Some(ctx.player), &format!("{who} arrives."));

    show_exits(ctx, dest, prev.as_ref());
}
