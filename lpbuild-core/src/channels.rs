//! Channel grouping by track.
//!
//! A recipe can only publish to one track, but to any number of risks within
//! it, so a branch's `channels` list is split into one group per track.

use serde::Serialize;

/// The channels of one track, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelGroup {
    pub track: String,
    pub channels: Vec<String>,
}

/// Track of a `track` or `track/risk` channel.
pub fn track_of(channel: &str) -> &str {
    channel.split_once('/').map_or(channel, |(track, _)| track)
}

/// Group `channels` by track.
///
/// Groups are ordered by the first appearance of their track; channels keep
/// input order inside each group. An empty input yields no groups.
pub fn group_channels<S: AsRef<str>>(channels: &[S]) -> Vec<ChannelGroup> {
    let mut groups: Vec<ChannelGroup> = Vec::new();
    for channel in channels {
        let channel = channel.as_ref();
        let track = track_of(channel);
        match groups.iter_mut().find(|g| g.track == track) {
            Some(group) => group.channels.push(channel.to_owned()),
            None => groups.push(ChannelGroup {
                track: track.to_owned(),
                channels: vec![channel.to_owned()],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_of_channel() {
        assert_eq!(track_of("latest"), "latest");
        assert_eq!(track_of("xena/edge"), "xena");
        assert_eq!(track_of("2.0/stable/hotfix"), "2.0");
    }

    #[test]
    fn single_track_with_risks() {
        let groups = group_channels(&["latest", "latest/edge", "latest/stable"]);
        assert_eq!(
            groups,
            vec![ChannelGroup {
                track: "latest".into(),
                channels: vec!["latest".into(), "latest/edge".into(), "latest/stable".into()],
            }]
        );
    }

    #[test]
    fn interleaved_tracks_keep_first_seen_order() {
        let groups = group_channels(&["yoga/edge", "latest/edge", "yoga/stable"]);
        let tracks: Vec<&str> = groups.iter().map(|g| g.track.as_str()).collect();
        assert_eq!(tracks, vec!["yoga", "latest"]);
        assert_eq!(groups[0].channels, vec!["yoga/edge", "yoga/stable"]);
    }
}
