use mudworld::{EntityId, EntityKey};

use crate::dispatch::Ctx;

pub fn execute(ctx: &mut Ctx<'_>, _args: &str) {
    let Some(here) = ctx.here() else {
        ctx.tell("You are nowhere.");
        return;
    };
    if ctx.here_room().is_none() {
        let key = ctx.key_of(here);
        ctx.tell(&format!("This location: {key}."));
        return;
    }

    if let Some(title) = ctx.world.title(here).map(str::to_owned) {
        ctx.tell(&format!("{title}  "));
    }
    show_exits(ctx, here, None);

    for other in ctx.world.children(here) {
        if other == ctx.player {
            continue;
        }
        let key = ctx.key_of(other);
        ctx.tell(&format!("There is {key} here."));
    }
}

/// Exit descriptions of `room` with exit names highlighted, skipping exits
/// that lead back to `back`.
pub(super) fn show_exits(ctx: &mut Ctx<'_>, room: EntityId, back: Option<&EntityKey>) {
    let Some(r) = ctx.world.room(room) else {
        return;
    };
    let keys: Vec<String> = r.exit_keys().into_iter().map(str::to_owned).collect();
    let descs: Vec<String> = r
        .exits()
        .iter()
        .filter(|e| Some(&e.target) != back)
        .filter_map(|e| e.desc.clone())
        .collect();

    ctx.highlight(&keys);
    for d in descs {
        ctx.tell(&format!("{d}  "));
    }
    ctx.clear_highlight();
}
