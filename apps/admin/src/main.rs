use std::num::NonZeroUsize;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::{load_settings, PAGE_SIZE_CHOICES},
    http_controller, ApiClient, ControllerError, ControllerOptions, FilterUpdate, FormError,
    FormSession, ResourceListController,
};
use serde_json::Value;
use shared::{
    domain::{CategoryFields, CouponFields, CustomerFields, ResourceId},
    schema::{ResourceSchema, IS_ACTIVE},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod table;

use table::{page_footer, render, render_details, TableRow};

#[derive(Parser, Debug)]
#[command(name = "admin", about = "Storefront admin console")]
struct Cli {
    /// Overrides `api_url` from admin.toml and the environment.
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    api_key: Option<String>,
    #[command(subcommand)]
    resource: Resource,
}

#[derive(Subcommand, Debug)]
enum Resource {
    Coupon {
        #[command(subcommand)]
        action: Action,
    },
    Category {
        #[command(subcommand)]
        action: Action,
    },
    Customer {
        #[command(subcommand)]
        action: Action,
    },
}

#[derive(Subcommand, Debug)]
enum Action {
    List {
        #[arg(long, default_value = "")]
        query: String,
        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        page_size: Option<usize>,
    },
    Show {
        id: String,
    },
    Create {
        /// Entity fields as a JSON object.
        #[arg(long)]
        json: String,
    },
    Update {
        id: String,
        /// Fields to change, as a JSON object merged over the current entity.
        #[arg(long)]
        json: String,
    },
    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
    Toggle {
        id: String,
        #[arg(long, default_value = IS_ACTIVE)]
        flag: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }
    if let Some(api_key) = cli.api_key {
        settings.api_key = Some(api_key);
    }
    let api = ApiClient::from_settings(&settings)?;
    info!(api_url = %api.base_url(), "admin: using storefront api");

    let options = ControllerOptions {
        page_size: NonZeroUsize::new(settings.page_size)
            .unwrap_or(client_core::filter::DEFAULT_PAGE_SIZE),
        request_timeout: Some(settings.request_timeout()),
    };

    match cli.resource {
        Resource::Coupon { action } => {
            run(http_controller::<CouponFields>(api, options), action).await
        }
        Resource::Category { action } => {
            run(http_controller::<CategoryFields>(api, options), action).await
        }
        Resource::Customer { action } => {
            run(http_controller::<CustomerFields>(api, options), action).await
        }
    }
}

async fn run<F>(controller: std::sync::Arc<ResourceListController<F>>, action: Action) -> Result<()>
where
    F: ResourceSchema + TableRow,
{
    controller
        .load()
        .await
        .with_context(|| format!("failed to load {}s", F::KIND))?;

    match action {
        Action::List {
            query,
            page,
            page_size,
        } => {
            let mut update = FilterUpdate::query(query);
            if let Some(size) = page_size {
                if !PAGE_SIZE_CHOICES.contains(&size) {
                    bail!("page size must be one of {PAGE_SIZE_CHOICES:?}");
                }
                update.page_size = NonZeroUsize::new(size);
            }
            controller.set_filter(update);
            let slice = controller.set_filter(FilterUpdate::page(page.saturating_sub(1)));
            println!("{}", render(&slice.items));
            println!("{}", page_footer(&slice));
        }
        Action::Show { id } => {
            let record = controller.refresh(&ResourceId::from(id)).await?;
            println!("{}", render(std::slice::from_ref(&record)));
            let details = render_details(&record.fields);
            if !details.is_empty() {
                println!("{details}");
            }
        }
        Action::Create { json } => {
            let draft: F = serde_json::from_str(&json)
                .with_context(|| format!("--json is not a valid {}", F::KIND))?;
            let mut form = FormSession::create(draft);
            match submit(&mut form, &controller).await? {
                Some(record) => {
                    println!("created {} {}", F::KIND, record.id);
                    println!("{}", render(std::slice::from_ref(&record)));
                }
                None => println!("created {} (server did not return an id)", F::KIND),
            }
        }
        Action::Update { id, json } => {
            let id = ResourceId::from(id);
            let current = controller
                .get(&id)
                .ok_or_else(|| ControllerError::NotFound(id.clone()))?;
            let patch: Value = serde_json::from_str(&json).context("--json is not valid JSON")?;
            let mut form = FormSession::edit(&current);
            *form.draft_mut() = merge_fields(&current.fields, patch)?;
            if let Some(record) = submit(&mut form, &controller).await? {
                println!("updated {} {}", F::KIND, record.id);
                println!("{}", render(std::slice::from_ref(&record)));
            }
        }
        Action::Delete { id, yes } => {
            if !yes {
                bail!("refusing to delete {} {id} without --yes", F::KIND);
            }
            controller.remove(&ResourceId::from(id.as_str())).await?;
            println!("deleted {} {id}", F::KIND);
        }
        Action::Toggle { id, flag } => {
            let record = controller.toggle(&ResourceId::from(id), &flag).await?;
            println!(
                "{} {} {flag} = {}",
                F::KIND,
                record.id,
                record.fields.flag(&flag).unwrap_or_default()
            );
        }
    }

    Ok(())
}

async fn submit<F: ResourceSchema>(
    form: &mut FormSession<F>,
    controller: &ResourceListController<F>,
) -> Result<Option<shared::domain::Record<F>>> {
    match form.submit(controller).await {
        Ok(record) => Ok(record),
        Err(FormError::Controller(err)) if !form.validation_errors().is_empty() => {
            for (field, message) in form.validation_errors().iter() {
                eprintln!("  {field}: {message}");
            }
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

/// Overlays the keys of a JSON object onto the serialized form of `fields`.
fn merge_fields<F: ResourceSchema>(fields: &F, patch: Value) -> Result<F> {
    let Value::Object(patch) = patch else {
        bail!("--json must be a JSON object");
    };
    let mut merged = serde_json::to_value(fields)?;
    if let Value::Object(target) = &mut merged {
        target.extend(patch);
    }
    serde_json::from_value(merged).context("merged fields do not form a valid entity")
}
