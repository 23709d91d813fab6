use mudtext::fmt::CLEAR_SCREEN;

use crate::dispatch::Ctx;

pub fn execute(ctx: &mut Ctx<'_>, _args: &str) {
    ctx.tell_raw(CLEAR_SCREEN);
}
