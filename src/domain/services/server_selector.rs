//! Episode server selection
//!
//! Picks the default playback server for a movie so a first episode can be
//! started without user interaction.

use crate::domain::entities::{EpisodeItem, EpisodeServer, MovieDetail};

/// Select the default playback server.
///
/// Priority: a server whose name contains "VIP" (any case), then one whose
/// name contains "1", then the first server in list order.
pub fn select_best_server(servers: &[EpisodeServer]) -> Option<&EpisodeServer> {
    servers
        .iter()
        .find(|s| s.server_name.to_uppercase().contains("VIP"))
        .or_else(|| servers.iter().find(|s| s.server_name.contains('1')))
        .or_else(|| servers.first())
}

/// The server and episode a player should open first.
pub fn initial_episode(detail: &MovieDetail) -> Option<(&EpisodeServer, &EpisodeItem)> {
    let server = select_best_server(&detail.episodes)?;
    server.items.first().map(|item| (server, item))
}
