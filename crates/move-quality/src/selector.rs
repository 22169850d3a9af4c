//! Picks the games a player took part in.

use crate::config::ConfigError;
use crate::game::{Color, Game};

/// A game the target player played, with the colour they had.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedGame<'a> {
    /// 0-based index in the loaded game list.
    pub index: usize,
    pub game: &'a Game,
    pub color: Color,
}

/// Colour `player` had in `game`, if any.
///
/// A game whose White and Black headers both equal `player` resolves to
/// White.
pub fn player_color(game: &Game, player: &str) -> Option<Color> {
    if game.white() == Some(player) {
        Some(Color::White)
    } else if game.black() == Some(player) {
        Some(Color::Black)
    } else {
        None
    }
}

/// Keep the games `player` took part in, in their original order.
///
/// # Errors
///
/// Returns [`ConfigError::PlayerNotFound`] when no game matches.
pub fn select_player_games<'a>(
    games: &'a [Game],
    player: &str,
) -> Result<Vec<SelectedGame<'a>>, ConfigError> {
    let selected: Vec<SelectedGame<'a>> = games
        .iter()
        .enumerate()
        .filter_map(|(index, game)| {
            player_color(game, player).map(|color| SelectedGame { index, game, color })
        })
        .collect();

    if selected.is_empty() {
        return Err(ConfigError::PlayerNotFound(player.to_string()));
    }

    tracing::info!(
        player,
        selected = selected.len(),
        total = games.len(),
        "selected games"
    );
    Ok(selected)
}
