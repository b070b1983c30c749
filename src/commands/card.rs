use crate::clock::Clock;
use crate::commands::{open_escrow, Out};
use crate::model::Card;
use crate::{Config, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Links a card after the configured processing delay. `_cvc` is accepted and dropped.
pub async fn card_add(
    config: &Config,
    clock: Arc<dyn Clock>,
    number: &str,
    expiry: &str,
    _cvc: Option<&str>,
) -> Result<Out<Card>> {
    let mut escrow = open_escrow(config, clock).await?;
    let delay = config.card_processing_delay();
    if !delay.is_zero() {
        info!("Processing card...");
    }
    let card = escrow
        .link_card(number, expiry, delay)
        .await?
        .clone();
    debug!("Linked card {}", card.id());
    Ok(Out::new(
        format!(
            "Linked {} expiring {}/{} (id {})",
            card.method_label(),
            card.exp_month(),
            card.exp_year(),
            card.id()
        ),
        card,
    ))
}

pub async fn card_list(config: &Config, clock: Arc<dyn Clock>) -> Result<Out<Vec<Card>>> {
    let escrow = open_escrow(config, clock).await?;
    let cards = escrow.state().linked_cards.clone();
    if cards.is_empty() {
        return Ok(Out::new("No cards linked", cards));
    }
    let message = cards
        .iter()
        .map(|c| {
            format!(
                "{}  {}/{}  {}",
                c.method_label(),
                c.exp_month(),
                c.exp_year(),
                c.id()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    Ok(Out::new(message, cards))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CardBrand;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_card_add_and_list() {
        let env = TestEnv::new().await;
        let out = card_add(
            &env.config(),
            env.clock(),
            "4242424242424242",
            "12/25",
            Some("123"),
        )
        .await
        .unwrap();
        let card = out.structure().unwrap();
        assert_eq!(card.last4(), "4242");
        assert_eq!(card.brand(), CardBrand::Visa);

        let saved = std::fs::read_to_string(env.home().join("rentpacer_state.json")).unwrap();
        assert!(!saved.contains("cvc"));

        let out = card_list(&env.config(), env.clock()).await.unwrap();
        assert_eq!(out.structure().unwrap().len(), 1);
        assert!(out.message().starts_with("Visa •••• 4242  12/25"));
    }

    #[tokio::test]
    async fn test_card_list_empty() {
        let env = TestEnv::new().await;
        let out = card_list(&env.config(), env.clock()).await.unwrap();
        assert_eq!(out.message(), "No cards linked");
    }
}
