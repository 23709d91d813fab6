//! `dig [to:KEY] DIR [REVERSE|-]`
//!
//! Opens an exit from the current room to `KEY`, or to a fresh room when no
//! destination is given. The way back is added automatically for compass
//! and vertical directions unless `-` is given as the reverse.

use mudworld::room::{expand_alias, reverse_direction};
use mudworld::{EntityKey, Kind, MAX_EXITS};

use crate::dispatch::{Ctx, split_args};

pub fn execute(ctx: &mut Ctx<'_>, args: &str) {
    let Some(here) = ctx.here_room() else {
        ctx.refuse("You cannot dig here.");
        return;
    };

    let mut args = split_args(args, 3);
    let Some(first) = args.first().copied() else {
        ctx.tell("Dig where?");
        return;
    };
    if first.starts_with('?') {
        ctx.tell("Direction or room ID.");
        return;
    }

    let mut dest_key: Option<EntityKey> = None;
    if let Some(to) = first.strip_prefix("to:") {
        if to.contains('?') {
            ctx.tell("Room ID.");
            return;
        }
        let key: EntityKey = match to.parse() {
            Ok(k) => k,
            Err(e) => {
                ctx.refuse(&format!("Bad room ID: {e}."));
                return;
            }
        };
        if key.kind() != Kind::Room {
            ctx.refuse("You can only dig to rooms.");
            return;
        }
        dest_key = Some(key);
        args.remove(0);
    }

    let Some(dir) = args.first().copied() else {
        ctx.tell("Dig where?");
        return;
    };
    if dir.contains('?') {
        ctx.tell("Direction.");
        return;
    }
    let rev_arg = args.get(1).copied();
    if rev_arg.is_some_and(|r| r.contains('?')) {
        ctx.tell("Reverse direction or '-' to prevent automatic reversing.");
        return;
    }

    let dir = expand_alias(dir).unwrap_or(dir).to_string();
    let rev = match rev_arg.map(|r| expand_alias(r).unwrap_or(r)) {
        Some("-") => None,
        Some(r) => Some(r.to_string()),
        None => {
            let r = reverse_direction(&dir);
            if r.is_none() {
                ctx.tell("No reverse direction.");
            }
            r.map(str::to_string)
        }
    };

    let blocked = ctx
        .world
        .room(here)
        .is_none_or(|r| r.exit(&dir).is_some() || r.exits().len() >= MAX_EXITS);
    if blocked {
        ctx.refuse(&format!("Cannot dig the way to {dir}."));
        return;
    }

    let dest_key = match dest_key {
        Some(k) => k,
        None => match ctx.world.next_id(Kind::Room) {
            Some(n) => EntityKey::numbered(Kind::Room, n),
            None => {
                ctx.refuse("There are no room numbers left; dig to:KEY instead.");
                return;
            }
        },
    };
    let dest = ctx.world.find(&dest_key);
    let Some(here_key) = ctx.world.key(here).cloned() else {
        return;
    };

    if let Some(Err(e)) = ctx.world.room_mut(here).map(|r| r.add_exit(&dir, dest_key.clone())) {
        ctx.refuse(&format!("Cannot dig the way to {dir}: {e}."));
        return;
    }
    ctx.tell(&format!("You dig {dir} to {dest_key}."));

    if let Some(rev) = rev {
        if let Some(Err(e)) = ctx.world.room_mut(dest).map(|r| r.add_exit(&rev, here_key)) {
            ctx.refuse(&format!("Cannot dig the way back {rev}: {e}."));
        }
    }

    ctx.tell_room(dest, Some(ctx.player), "Something is changed.");
    ctx.tell_room(here, Some(ctx.player), "Someone dug.");
}
