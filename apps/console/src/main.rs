use std::sync::Arc;

use anyhow::{Context, Result};
use binder::{
    bind_click_counter, bind_temperature_fetch, ClickCounter, Endpoint, ErrorDisplay,
    FetchOptions, FetchOutcome, Page, Trigger, WritePolicy,
};
use clap::{Parser, ValueEnum};
use shared::domain::{SurfaceMode, DEFAULT_API_NAME, DEFAULT_SITE};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Variant {
    /// Buttons by position, counter appends, status checked, nested body.
    Append,
    /// Buttons by id, counter replaces, status ignored, flat body.
    Replace,
}

#[derive(Parser, Debug)]
#[command(about = "Drive a simulated page: click counter plus lake temperature fetch")]
struct Args {
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    server_url: String,
    #[arg(long, default_value = DEFAULT_API_NAME)]
    endpoint: String,
    #[arg(long, default_value = DEFAULT_SITE)]
    site: String,
    #[arg(long, value_enum, default_value_t = Variant::Replace)]
    variant: Variant,
    /// Counter activations, handled one after another.
    #[arg(long, default_value_t = 0)]
    clicks: u32,
    /// Fetch activations, all started before any completes.
    #[arg(long, default_value_t = 1)]
    fetches: u32,
    #[arg(long)]
    show_errors: bool,
    /// Let whichever response resolves last win instead of the latest request.
    #[arg(long)]
    last_resolved: bool,
    #[arg(long, default_value = "")]
    initial_text: String,
}

impl Args {
    fn fetch_options(&self) -> FetchOptions {
        let options = match self.variant {
            Variant::Append => FetchOptions::checked_nested(),
            Variant::Replace => FetchOptions::unchecked_flat(),
        };
        let error_display = if self.show_errors {
            ErrorDisplay::Message
        } else {
            ErrorDisplay::Silent
        };
        let write_policy = if self.last_resolved {
            WritePolicy::LastResolved
        } else {
            WritePolicy::LatestTriggered
        };
        options
            .with_site(self.site.clone())
            .with_error_display(error_display)
            .with_write_policy(write_policy)
    }

    fn counter_mode(&self) -> SurfaceMode {
        match self.variant {
            Variant::Append => SurfaceMode::Append,
            Variant::Replace => SurfaceMode::Replace,
        }
    }
}

fn lookup_triggers(page: &Page, variant: Variant) -> Result<(Trigger, Trigger)> {
    let triggers = match variant {
        Variant::Append => (page.trigger_at(0)?, page.trigger_at(1)?),
        Variant::Replace => (page.trigger("button1")?, page.trigger("button2")?),
    };
    Ok(triggers)
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let args = Args::parse();

    let endpoint = Endpoint::api(&args.server_url, &args.endpoint)
        .with_context(|| format!("cannot build endpoint from '{}'", args.server_url))?;

    let mut page = Page::new();
    page.add_trigger("button1")?;
    page.add_trigger("button2")?;
    let text = page.add_surface("text", args.initial_text.clone())?;
    let (count_button, fetch_button) = lookup_triggers(&page, args.variant)?;

    let mut clicks = bind_click_counter(
        &count_button,
        text.clone(),
        Arc::new(ClickCounter::new()),
        args.counter_mode(),
    );
    let mut fetches = bind_temperature_fetch(
        &fetch_button,
        text.clone(),
        endpoint,
        args.fetch_options(),
    );

    for _ in 0..args.clicks {
        count_button.activate();
        if let Some(count) = clicks.next_report().await {
            info!(count, "counter updated");
        }
    }

    for _ in 0..args.fetches {
        fetch_button.activate();
    }
    for _ in 0..args.fetches {
        match fetches.next_report().await {
            Some(Ok(FetchOutcome::Displayed { seq, reading })) => {
                info!(%seq, temp = reading.temp, "reading displayed")
            }
            Some(Ok(FetchOutcome::Stale { seq, .. })) => info!(%seq, "stale reading discarded"),
            Some(Err(error)) => warn!(%error, "fetch failed"),
            None => break,
        }
    }

    println!("{}", text.text());
    Ok(())
}
