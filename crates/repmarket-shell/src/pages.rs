//! Routes the shell registers by default.
//!
//! Feature pages (dashboards, forms, chat) replace these placeholders by
//! registering the same patterns again.

use repmarket_auth::SessionManager;
use repmarket_router::{RouteOptions, RouteRequest, Router, REDIRECT_PARAM};
use repmarket_types::Role;
use repmarket_web::Views;

/// A placeholder page: path, title, access, and lead text.
struct Placeholder {
    pattern: &'static str,
    title: &'static str,
    roles: Option<&'static [Role]>,
    lead: &'static str,
}

const PLACEHOLDERS: &[Placeholder] = &[
    Placeholder {
        pattern: "/",
        title: "Home",
        roles: None,
        lead: "Connecting independent sales reps with growing businesses.",
    },
    Placeholder {
        pattern: "/browse",
        title: "Browse",
        roles: None,
        lead: "Open opportunities from businesses looking for reps.",
    },
    Placeholder {
        pattern: "/signup",
        title: "Sign up",
        roles: None,
        lead: "Create a rep or business account.",
    },
    Placeholder {
        pattern: "/rep/dashboard",
        title: "Rep dashboard",
        roles: Some(&[Role::Rep]),
        lead: "Your pipeline, contracts and commissions.",
    },
    Placeholder {
        pattern: "/rep/opportunities",
        title: "Opportunities",
        roles: Some(&[Role::Rep]),
        lead: "Opportunities matching your territory.",
    },
    Placeholder {
        pattern: "/business/dashboard",
        title: "Business dashboard",
        roles: Some(&[Role::Business]),
        lead: "Your listings, reps and contracts.",
    },
    Placeholder {
        pattern: "/business/opportunities/new",
        title: "Post opportunity",
        roles: Some(&[Role::Business]),
        lead: "Describe the product, territory and commission.",
    },
    Placeholder {
        pattern: "/business/reps",
        title: "Reps",
        roles: Some(&[Role::Business]),
        lead: "Reps working with your business.",
    },
    Placeholder {
        pattern: "/messages",
        title: "Messages",
        roles: Some(&[]),
        lead: "Conversations with your partners.",
    },
];

/// Register the default routes and the not-found and error views.
pub fn register(
    router: &Router,
    auth: &SessionManager,
    views: &Views,
) -> repmarket_router::Result<()> {
    for page in PLACEHOLDERS {
        let options = match page.roles {
            None => RouteOptions::public(),
            Some([]) => RouteOptions::authenticated(),
            Some(roles) => RouteOptions::for_roles(roles.iter().copied()),
        }
        .titled(page.title);

        let views = views.clone();
        let (heading, lead) = (page.title, page.lead);
        router.add_route(page.pattern, options, move |_| {
            Ok(views.page(heading, Some(lead))?)
        })?;
    }

    let login_views = views.clone();
    router.add_route("/login", RouteOptions::public().titled("Log in"), move |req| {
        login_page(&login_views, req)
    })?;

    let logout_views = views.clone();
    let logout_auth = auth.clone();
    router.add_route("/logout", RouteOptions::public().titled("Logged out"), move |_| {
        logout_auth.logout();
        Ok(logout_views.page("You have been logged out", None)?)
    })?;

    let detail_views = views.clone();
    router.add_route(
        "/opportunities/:id",
        RouteOptions::authenticated().titled("Opportunity"),
        move |req| {
            let heading = format!("Opportunity {}", req.param("id").unwrap_or_default());
            Ok(detail_views.page(&heading, None)?)
        },
    )?;

    let contract_views = views.clone();
    router.add_route(
        "/contracts/:id",
        RouteOptions::authenticated().titled("Contract"),
        move |req| {
            let heading = format!("Contract {}", req.param("id").unwrap_or_default());
            Ok(contract_views.page(&heading, None)?)
        },
    )?;

    let not_found_views = views.clone();
    router.set_not_found(move |req| {
        not_found_views
            .not_found(&req.path)
            .unwrap_or_else(|_| format!("Page not found: {}", req.path))
    });

    let error_views = views.clone();
    router.set_error_handler(move |_, err| {
        let message = err.to_string();
        error_views.error(&message).unwrap_or(message)
    });

    Ok(())
}

fn login_page(views: &Views, req: &RouteRequest) -> anyhow::Result<String> {
    let lead = req
        .query_param(REDIRECT_PARAM)
        .map(|path| format!("Log in to continue to {path}."));
    let lead = match (&req.user, lead) {
        (Some(user), _) => Some(format!("You are logged in as {}.", user.name())),
        (None, lead) => lead,
    };
    Ok(views.page("Log in", lead.as_deref())?)
}
