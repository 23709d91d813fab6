use glob::Pattern;

use crate::dispatch::{Ctx, split_args};

/// `objects [PATTERN]`: every entity key, or those matching a glob such as
/// `room/*`.
pub fn execute(ctx: &mut Ctx<'_>, args: &str) {
    let args = split_args(args, 1);
    let pattern = match args.first().map(|p| Pattern::new(p)) {
        None => None,
        Some(Ok(p)) => Some(p),
        Some(Err(e)) => {
            ctx.refuse(&format!("Bad pattern: {}.", e.msg));
            return;
        }
    };

    let keys: Vec<String> = ctx
        .world
        .all()
        .into_iter()
        .map(|id| ctx.key_of(id))
        .filter(|k| pattern.as_ref().is_none_or(|p| p.matches(k)))
        .collect();
    if keys.is_empty() {
        ctx.tell("Nothing matches.");
        return;
    }
    ctx.tell(&format!("{}.", keys.join(", ")));
}
