use tracing::warn;

use crate::dispatch::{Ctx, split_args};

const KINDS: [&str; 4] = ["title", "travel", "exit", "save"];

pub fn execute(ctx: &mut Ctx<'_>, args: &str) {
    let v = split_args(args, 2);
    let Some(&what) = v.first() else {
        ctx.tell("Describe what?");
        return;
    };
    let Some(m) = ctx.match_input(what, &KINDS) else {
        return;
    };

    match KINDS[m] {
        "title" => title(ctx, v.get(1).copied()),
        "save" => save(ctx),
        kind => exit_text(ctx, kind, v.get(1).copied()),
    }
}

fn title(ctx: &mut Ctx<'_>, text: Option<&str>) {
    let Some(here) = ctx.here() else {
        ctx.refuse("You are nowhere.");
        return;
    };
    let Some(text) = text else {
        ctx.tell("And the title please?");
        return;
    };
    ctx.world.set_title(here, Some(text.to_string()));
    ctx.tell("Title updated.");
}

fn exit_text(ctx: &mut Ctx<'_>, kind: &str, rest: Option<&str>) {
    let Some(rest) = rest else {
        ctx.tell("Which direction?");
        return;
    };
    let Some(here) = ctx.here_room() else {
        ctx.refuse("There are no exits here.");
        return;
    };

    let v = split_args(rest, 2);
    let keys: Vec<String> = ctx
        .world
        .room(here)
        .map(|r| r.exit_keys().into_iter().map(str::to_owned).collect())
        .unwrap_or_default();
    let Some(i) = v.first().and_then(|dir| ctx.match_input(dir, &keys)) else {
        return;
    };
    let Some(&text) = v.get(1) else {
        ctx.tell("And the description please?");
        return;
    };

    let dir = &keys[i];
    let res = ctx.world.room_mut(here).map(|r| {
        if kind == "travel" {
            r.set_travel_desc(dir, Some(text.to_string()))
        } else {
            r.set_exit_desc(dir, Some(text.to_string()))
        }
    });
    match res {
        Some(Ok(())) => ctx.tell("Description updated."),
        Some(Err(e)) => ctx.refuse(&format!("Nothing happens: {e}.")),
        None => {}
    }
}

fn save(ctx: &mut Ctx<'_>) {
    match mudworld::script::save(ctx.world, &ctx.config.world_path) {
        Ok(_) => ctx.tell("Saved."),
        Err(e) => {
            warn!(error = %e, path = %ctx.config.world_path.display(), "save failed");
            ctx.refuse("The world could not be saved.");
        }
    }
}
