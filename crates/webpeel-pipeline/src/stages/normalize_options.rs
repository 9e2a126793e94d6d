//! Stage 1 — NormalizeOptions (spec.md §4.2): pure. Applies `agentMode`
//! defaults and forces `render=true` when any rendering-implying option is
//! set.

use webpeel_types::PipelineContext;

/// Apply stage 1 in place. Pure with respect to the outside world — reads
/// and writes only `ctx`.
pub fn normalize(ctx: &mut PipelineContext) {
    if let Some(agent_mode) = ctx.options.agent_mode.clone() {
        if ctx.options.budget.is_none() {
            ctx.options.budget = Some(agent_mode.budget);
        }
        ctx.format = agent_mode.format;
        ctx.options.format = agent_mode.format;
    }

    // "Force render=true if any of {screenshot, stealth, actions non-empty,
    // branding, auto-scroll} is set" (spec.md §4.2 Stage 1).
    let forces_render = ctx.options.screenshot
        || ctx.options.stealth
        || !ctx.options.actions.is_empty()
        || ctx.options.branding
        || ctx.options.auto_scroll
        || ctx.options.cloaked;
    if forces_render {
        ctx.options.render = true;
    }

    ctx.mark("normalize_options");
}

#[cfg(test)]
mod tests {
    use super::*;
    use webpeel_types::PeelOptions;

    fn ctx_with(opts: PeelOptions) -> PipelineContext {
        PipelineContext::new(url::Url::parse("https://example.com").unwrap(), opts)
    }

    #[test]
    fn forces_render_on_screenshot() {
        let mut opts = PeelOptions::default();
        opts.screenshot = true;
        let mut ctx = ctx_with(opts);
        normalize(&mut ctx);
        assert!(ctx.options.render);
    }

    #[test]
    fn agent_mode_seeds_budget_and_format() {
        let mut opts = PeelOptions::default();
        opts.agent_mode = Some(webpeel_types::AgentModeOptions::default());
        let mut ctx = ctx_with(opts);
        normalize(&mut ctx);
        assert_eq!(ctx.options.budget, Some(4000));
        assert!(matches!(ctx.format, webpeel_types::Format::Markdown));
    }

    #[test]
    fn explicit_budget_not_overridden_by_agent_mode() {
        let mut opts = PeelOptions::default();
        opts.budget = Some(1500);
        opts.agent_mode = Some(webpeel_types::AgentModeOptions::default());
        let mut ctx = ctx_with(opts);
        normalize(&mut ctx);
        assert_eq!(ctx.options.budget, Some(1500));
    }
}
