use crate::dispatch::Ctx;

pub fn execute(ctx: &mut Ctx<'_>, args: &str) {
    let text = args.trim();
    if text.is_empty() {
        ctx.tell("Say what?");
        return;
    }
    ctx.tell(&format!("You say: {text}"));
    if let Some(here) = ctx.here() {
        let who = ctx.key_of(ctx.player);
        ctx.tell_room(here, Some(ctx.player), &format!("{who} says: {text}"));
    }
}
