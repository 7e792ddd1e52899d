//! REST and SSE paths consumed by the client.
//!
//! Templates use `:param` placeholders that [`Endpoint::with`] substitutes
//! positionally.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    OAuth2Login,
    OAuth2Check,
    Logout,
    TokenReissue,
    Withdraw,
    Installations,
    Repositories,
    Branches,
    Sections,
    SectionsInit,
    SectionsReorder,
    SectionsContent,
    SectionsDelete,
    Generate,
    GenerateFallback,
    EvaluateDraft,
    EvaluateDraftFallback,
    PullRequest,
    SseSubscribe,
}

impl Endpoint {
    pub fn template(&self) -> &'static str {
        match self {
            Endpoint::OAuth2Login => "/oauth2/login",
            Endpoint::OAuth2Check => "/oauth2/check",
            Endpoint::Logout => "/users/logout",
            Endpoint::TokenReissue => "/users/reissue",
            Endpoint::Withdraw => "/users/withdraw",
            Endpoint::Installations => "/oauth2/installations",
            Endpoint::Repositories => "/repos",
            Endpoint::Branches => "/repos/:owner/:name/branches",
            Endpoint::Sections => "/repos/:owner/:name/sections",
            Endpoint::SectionsInit => "/repos/:owner/:name/sections/init",
            Endpoint::SectionsReorder => "/repos/:owner/:name/sections/reorder",
            Endpoint::SectionsContent => "/repos/:owner/:name/sections/content",
            Endpoint::SectionsDelete => "/repos/:owner/:name/sections/:sectionId",
            Endpoint::Generate => "/repos/:owner/:name/generate/sse",
            Endpoint::GenerateFallback => "/repos/fallback/generate/:taskId",
            Endpoint::EvaluateDraft => "/repos/:owner/:name/evaluate/draft/sse",
            Endpoint::EvaluateDraftFallback => "/repos/fallback/evaluate/draft/:taskId",
            Endpoint::PullRequest => "/repos/:owner/:name/pr",
            Endpoint::SseSubscribe => "/sse/subscribe",
        }
    }

    /// Replaces each `:param` segment, left to right, with the next argument.
    /// Placeholders without a matching argument are left untouched.
    pub fn with(&self, args: &[&str]) -> String {
        let mut args = args.iter();
        self.template()
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(_) => args
                    .next()
                    .map(|arg| (*arg).to_string())
                    .unwrap_or_else(|| segment.to_string()),
                None => segment.to_string(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn path(&self) -> String {
        self.template().to_string()
    }
}
