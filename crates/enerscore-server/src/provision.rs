//! Idempotent startup provisioning of regions and alert rules.

use enerscore_core::store::SuitabilityStore;

use crate::ServerConfig;

/// Apply the configuration's provisioning seeds.
///
/// Regions use the store's upsert semantics, so re-running is safe. Alert
/// rules have no natural upsert key besides their unique name, so a seed
/// rule is only added when no rule with that name exists yet.
pub async fn provision<S>(store: &S, cfg: &ServerConfig) -> Result<(), S::Error>
where
  S: SuitabilityStore,
{
  for region in &cfg.regions {
    let region = store.upsert_region(region.clone()).await?;
    tracing::debug!(region = %region.region_id, "provisioned region");
  }
  if !cfg.regions.is_empty() {
    tracing::info!(count = cfg.regions.len(), "provisioned regions");
  }

  let existing = store.list_alert_rules(false).await?;
  let mut added = 0usize;
  for seed in &cfg.alert_rules {
    if existing.iter().any(|r| r.name == seed.name) {
      continue;
    }
    let rule = store.add_alert_rule(seed.clone()).await?;
    tracing::debug!(rule = %rule.name, "provisioned alert rule");
    added += 1;
  }
  if added > 0 {
    tracing::info!(count = added, "provisioned alert rules");
  }

  Ok(())
}
