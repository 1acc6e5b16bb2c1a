//! Button pagination over a list of embeds.

use std::time::Duration;

use poise::CreateReply;
use poise::serenity_prelude as serenity;

use crate::bot::Context;
use crate::bot::Error;

const TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationState {
    /// One-based.
    pub current_page: usize,
    pub pages: usize,
}

impl PaginationState {
    pub fn new(pages: usize) -> Self {
        Self {
            current_page: 1,
            pages: pages.max(1),
        }
    }

    pub fn first_page(&mut self) {
        self.current_page = 1;
    }

    pub fn prev_page(&mut self) {
        if self.current_page > 1 {
            self.current_page -= 1;
        }
    }

    pub fn next_page(&mut self) {
        if self.current_page < self.pages {
            self.current_page += 1;
        }
    }

    pub fn last_page(&mut self) {
        self.current_page = self.pages;
    }

    /// Applies the button whose id is `action`. Returns whether it was one of ours.
    pub fn press(&mut self, action: &str) -> bool {
        match action {
            "first" => self.first_page(),
            "prev" => self.prev_page(),
            "next" => self.next_page(),
            "last" => self.last_page(),
            _ => return false,
        }
        true
    }

    pub fn index(&self) -> usize {
        self.current_page - 1
    }

    pub fn create_buttons(&self, id_prefix: &str, indicator: String) -> serenity::CreateActionRow {
        let button = |action: &str, label: &str, disabled: bool| {
            serenity::CreateButton::new(format!("{id_prefix}{action}"))
                .label(label)
                .style(serenity::ButtonStyle::Primary)
                .disabled(disabled)
        };
        let first = self.current_page == 1;
        let last = self.current_page == self.pages;

        serenity::CreateActionRow::Buttons(vec![
            button("first", "⏮", first),
            button("prev", "◀", first),
            serenity::CreateButton::new(format!("{id_prefix}page"))
                .label(indicator)
                .style(serenity::ButtonStyle::Secondary)
                .disabled(true),
            button("next", "▶", last),
            button("last", "⏭", last),
        ])
    }
}

/// Sends `pages` as an ephemeral reply and flips through them on button presses until the
/// buttons time out. `indicator` labels the page counter from `(current, total)`.
pub async fn paginate(
    ctx: Context<'_>,
    pages: Vec<serenity::CreateEmbed>,
    indicator: impl Fn(usize, usize) -> String + Send + Sync,
) -> Result<(), Error> {
    let Some(first) = pages.first() else {
        return Ok(());
    };
    let prefix = format!("{}:", ctx.id());
    let mut state = PaginationState::new(pages.len());

    ctx.send(
        CreateReply::default()
            .embed(first.clone())
            .components(vec![state.create_buttons(&prefix, indicator(1, state.pages))])
            .ephemeral(true),
    )
    .await?;

    loop {
        let filter_prefix = prefix.clone();
        let Some(press) = serenity::ComponentInteractionCollector::new(ctx.serenity_context())
            .author_id(ctx.author().id)
            .filter(move |press| press.data.custom_id.starts_with(&filter_prefix))
            .timeout(TIMEOUT)
            .await
        else {
            break;
        };
        let action = press
            .data
            .custom_id
            .strip_prefix(&prefix)
            .unwrap_or_default();
        if !state.press(action) {
            continue;
        }
        let message = serenity::CreateInteractionResponseMessage::new()
            .embed(pages[state.index()].clone())
            .components(vec![state.create_buttons(
                &prefix,
                indicator(state.current_page, state.pages),
            )]);
        press
            .create_response(
                ctx.serenity_context(),
                serenity::CreateInteractionResponse::UpdateMessage(message),
            )
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_new() {
        let p = PaginationState::new(10);
        assert_eq!(p.pages, 10);
        assert_eq!(p.current_page, 1);

        let p = PaginationState::new(0);
        assert_eq!(p.pages, 1);
        assert_eq!(p.index(), 0);
    }

    #[test]
    fn test_pagination_navigation() {
        let mut p = PaginationState::new(5);

        assert!(p.press("next"));
        assert!(p.press("next"));
        assert_eq!(p.current_page, 3);

        p.prev_page();
        p.prev_page();
        p.prev_page();
        assert_eq!(p.current_page, 1);

        p.last_page();
        p.next_page();
        assert_eq!(p.current_page, 5);
        assert_eq!(p.index(), 4);

        assert!(!p.press("page"));
        assert!(p.press("first"));
        assert_eq!(p.current_page, 1);
    }
}
