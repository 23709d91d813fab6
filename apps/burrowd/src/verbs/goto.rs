use mudworld::EntityKey;

use crate::dispatch::{Ctx, split_args};

/// Teleport to any entity, creating it when it does not exist yet.
pub fn execute(ctx: &mut Ctx<'_>, args: &str) {
    let args = split_args(args, 1);
    let Some(&target) = args.first() else {
        ctx.tell("Go to where?");
        return;
    };
    let key: EntityKey = match target.parse() {
        Ok(k) => k,
        Err(e) => {
            ctx.refuse(&format!("No such place: {e}."));
            return;
        }
    };

    let dest = ctx.world.find(&key);
    let from = ctx.here();
    let who = ctx.key_of(ctx.player);
    if !ctx.world.reparent(ctx.player, Some(dest)) {
        ctx.refuse("You cannot go there.");
        return;
    }
    if let Some(from) = from.filter(|f| *f != dest) {
        ctx.tell_room(from, Some(ctx.player), &format!("{who} vanishes."));
        ctx.tell_room(dest, Some(ctx.player), &format!("{who} appears."));
    }
    ctx.tell(&format!("You are in {key}."));
}
