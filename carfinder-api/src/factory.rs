//! Composition root: turns [`Settings`] into concrete sources and the search service.
//!
//! This is the only place that imports concrete source and expander types.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::{
    config::{SearchSettings, Settings, SourceKind, SourceSettings},
    domain::search::{
        expander::OpenAiExpander,
        source::{CatalogSource, MarketplaceSource},
        Aggregator, AggregatorConfig, QueryNormalizer, Result, SearchError, SourceDescriptor,
        SourceRegistry, VehicleSearch,
    },
};

/// Build the vehicle search service described by `settings`.
pub async fn build_vehicle_search(settings: &Settings) -> Result<VehicleSearch> {
    let registry = build_registry(&settings.sources, settings.search.source_timeout()).await?;
    let known_sources = registry.infos().into_iter().map(|info| info.name).collect();

    let mut normalizer = QueryNormalizer::new(known_sources);
    if let Some(expander) = build_expander(&settings.search) {
        normalizer = normalizer.with_expander(expander);
    }

    let aggregator = Aggregator::new(
        Arc::new(registry),
        AggregatorConfig {
            source_timeout: settings.search.source_timeout(),
        },
    );

    Ok(VehicleSearch::new(
        aggregator,
        normalizer,
        settings.search.cache_ttl(),
    ))
}

/// Build the registry in configuration order.
///
/// A source whose adapter cannot be created is logged and left out, so one
/// broken entry does not keep the others from serving.
pub async fn build_registry(
    sources: &[SourceSettings],
    source_timeout: Duration,
) -> Result<SourceRegistry> {
    let mut descriptors = Vec::with_capacity(sources.len());

    for settings in sources {
        match build_descriptor(settings, source_timeout).await {
            Ok(descriptor) => {
                info!(
                    source = %descriptor.name,
                    enabled = descriptor.enabled,
                    priority = descriptor.priority,
                    "Registered source"
                );
                descriptors.push(descriptor);
            }
            Err(err) => error!(source = %settings.name, error = %err, "Failed to create source"),
        }
    }

    if descriptors.is_empty() {
        warn!("No listing sources configured, every search will fail");
    }

    SourceRegistry::new(descriptors)
}

async fn build_descriptor(
    settings: &SourceSettings,
    source_timeout: Duration,
) -> Result<SourceDescriptor> {
    let descriptor = match settings.kind {
        SourceKind::Catalog => {
            let path = settings.path.as_deref().ok_or_else(|| {
                SearchError::Config(format!("catalog source '{}' has no path", settings.name))
            })?;
            let source = CatalogSource::load(path, &settings.name).await?;
            SourceDescriptor::new(&settings.name, settings.priority, source)
        }
        SourceKind::Marketplace => {
            let base_url = settings.base_url.as_deref().ok_or_else(|| {
                SearchError::Config(format!(
                    "marketplace source '{}' has no base_url",
                    settings.name
                ))
            })?;
            let source = MarketplaceSource::new(
                &settings.name,
                base_url,
                settings.api_key.clone(),
                source_timeout,
            )?;
            SourceDescriptor::new(&settings.name, settings.priority, source)
        }
    };

    Ok(if settings.enabled {
        descriptor
    } else {
        descriptor.disabled()
    })
}

fn build_expander(settings: &SearchSettings) -> Option<Arc<OpenAiExpander>> {
    let expander = settings.expander.as_ref()?;

    match OpenAiExpander::new(
        &expander.api_key,
        &expander.base_url,
        &expander.model,
        Duration::from_millis(expander.timeout_ms),
    ) {
        Ok(client) => {
            info!(model = %expander.model, "Query expansion enabled");
            Some(Arc::new(client))
        }
        Err(err) => {
            warn!(error = %err, "Query expansion disabled");
            None
        }
    }
}
