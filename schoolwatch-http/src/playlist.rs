//! Minimal M3U8 parsing: enough to follow a master playlist to its first
//! variant and to walk the segments of a live media playlist.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaylistError {
    #[error("missing #EXTM3U header")]
    MissingHeader,

    #[error("invalid value for {tag}: {value:?}")]
    InvalidTag { tag: &'static str, value: String },

    #[error("{0} is not followed by a uri")]
    MissingUri(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Playlist {
    Master(MasterPlaylist),
    Media(MediaPlaylist),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantStream {
    pub uri: String,
    pub bandwidth: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterPlaylist {
    pub variants: Vec<VariantStream>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaSegment {
    pub sequence: u64,
    pub duration_secs: f64,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaPlaylist {
    pub target_duration_secs: u64,
    pub media_sequence: u64,
    pub segments: Vec<MediaSegment>,
    /// `#EXT-X-ENDLIST` seen; no more segments will be added.
    pub ended: bool,
}

impl MediaPlaylist {
    /// Segments with a sequence number of at least `sequence`.
    pub fn segments_from(&self, sequence: u64) -> impl Iterator<Item = &MediaSegment> {
        self.segments.iter().filter(move |s| s.sequence >= sequence)
    }

    /// Sequence number the next appended segment will carry.
    pub fn end_sequence(&self) -> u64 {
        self.segments
            .last()
            .map_or(self.media_sequence, |s| s.sequence.saturating_add(1))
    }

    /// First sequence to fetch when joining: `edge` segments back from the
    /// end, or the start of a shorter playlist.
    pub fn live_edge(&self, edge: usize) -> u64 {
        self.segments
            .len()
            .checked_sub(edge)
            .and_then(|skip| self.segments.get(skip))
            .map_or(self.media_sequence, |s| s.sequence)
    }
}

pub fn parse(text: &str) -> Result<Playlist, PlaylistError> {
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty());

    if lines.next() != Some("#EXTM3U") {
        return Err(PlaylistError::MissingHeader);
    }

    let mut variants = Vec::new();
    let mut pending_variant: Option<Option<u64>> = None;
    let mut pending_duration: Option<f64> = None;
    let mut media = MediaPlaylist {
        target_duration_secs: 0,
        media_sequence: 0,
        segments: Vec::new(),
        ended: false,
    };

    for line in lines {
        if let Some(attributes) = line.strip_prefix("#EXT-X-STREAM-INF:") {
            pending_variant = Some(bandwidth(attributes)?);
        } else if let Some(value) = line.strip_prefix("#EXT-X-TARGETDURATION:") {
            media.target_duration_secs = number("#EXT-X-TARGETDURATION", value)?;
        } else if let Some(value) = line.strip_prefix("#EXT-X-MEDIA-SEQUENCE:") {
            media.media_sequence = number("#EXT-X-MEDIA-SEQUENCE", value)?;
        } else if let Some(value) = line.strip_prefix("#EXTINF:") {
            let duration = value.split(',').next().unwrap_or_default().trim();
            pending_duration = Some(duration.parse().map_err(|_| PlaylistError::InvalidTag {
                tag: "#EXTINF",
                value: value.to_string(),
            })?);
        } else if line == "#EXT-X-ENDLIST" {
            media.ended = true;
        } else if line.starts_with('#') {
            // unsupported tag or comment
        } else if let Some(bandwidth) = pending_variant.take() {
            variants.push(VariantStream {
                uri: line.to_string(),
                bandwidth,
            });
        } else if let Some(duration_secs) = pending_duration.take() {
            let sequence = media
                .media_sequence
                .checked_add(media.segments.len() as u64)
                .ok_or_else(|| PlaylistError::InvalidTag {
                    tag: "#EXT-X-MEDIA-SEQUENCE",
                    value: media.media_sequence.to_string(),
                })?;
            media.segments.push(MediaSegment {
                sequence,
                duration_secs,
                uri: line.to_string(),
            });
        }
    }

    if pending_variant.is_some() {
        return Err(PlaylistError::MissingUri("#EXT-X-STREAM-INF"));
    }
    if pending_duration.is_some() {
        return Err(PlaylistError::MissingUri("#EXTINF"));
    }
    if !variants.is_empty() {
        return Ok(Playlist::Master(MasterPlaylist { variants }));
    }
    Ok(Playlist::Media(media))
}

fn number(tag: &'static str, value: &str) -> Result<u64, PlaylistError> {
    value.trim().parse().map_err(|_| PlaylistError::InvalidTag {
        tag,
        value: value.to_string(),
    })
}

fn bandwidth(attributes: &str) -> Result<Option<u64>, PlaylistError> {
    attributes
        .split(',')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == "BANDWIDTH")
        .map(|(_, value)| number("BANDWIDTH", value))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_master_playlist() {
        let text = "#EXTM3U\n\
            #EXT-X-STREAM-INF:BANDWIDTH=1280000,RESOLUTION=1280x720\n\
            high/index.m3u8\n\
            #EXT-X-STREAM-INF:RESOLUTION=640x360\n\
            low/index.m3u8\n";

        let Playlist::Master(master) = parse(text).unwrap() else {
            panic!("expected a master playlist");
        };
        assert_eq!(
            master.variants,
            vec![
                VariantStream {
                    uri: "high/index.m3u8".into(),
                    bandwidth: Some(1_280_000)
                },
                VariantStream {
                    uri: "low/index.m3u8".into(),
                    bandwidth: None
                },
            ]
        );
    }

    #[test]
    fn parses_live_media_playlist() {
        let text = "#EXTM3U\r\n\
            #EXT-X-VERSION:3\r\n\
            #EXT-X-TARGETDURATION:4\r\n\
            #EXT-X-MEDIA-SEQUENCE:120\r\n\
            \r\n\
            #EXTINF:4.000,\r\n\
            seg120.ts\r\n\
            #EXTINF:3.5,live\r\n\
            seg121.ts\r\n";

        let Playlist::Media(media) = parse(text).unwrap() else {
            panic!("expected a media playlist");
        };
        assert_eq!(media.target_duration_secs, 4);
        assert_eq!(media.media_sequence, 120);
        assert!(!media.ended);
        assert_eq!(media.segments.len(), 2);
        assert_eq!(media.segments[0].sequence, 120);
        assert_eq!(media.segments[0].duration_secs, 4.0);
        assert_eq!(media.segments[1].uri, "seg121.ts");
        assert_eq!(media.segments[1].sequence, 121);

        let newer: Vec<&str> = media.segments_from(121).map(|s| s.uri.as_str()).collect();
        assert_eq!(newer, vec!["seg121.ts"]);
    }

    #[test]
    fn endlist_marks_playlist_finished() {
        let text = "#EXTM3U\n#EXT-X-TARGETDURATION:2\n#EXTINF:2,\na.ts\n#EXT-X-ENDLIST\n";
        let Playlist::Media(media) = parse(text).unwrap() else {
            panic!("expected a media playlist");
        };
        assert!(media.ended);
    }

    #[test]
    fn rejects_missing_header() {
        assert_eq!(parse("<html>502 Bad Gateway</html>"), Err(PlaylistError::MissingHeader));
        assert_eq!(parse(""), Err(PlaylistError::MissingHeader));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            parse("#EXTM3U\n#EXT-X-TARGETDURATION:soon\n"),
            Err(PlaylistError::InvalidTag { tag: "#EXT-X-TARGETDURATION", .. })
        ));
        assert!(matches!(
            parse("#EXTM3U\n#EXTINF:abc,\nx.ts\n"),
            Err(PlaylistError::InvalidTag { tag: "#EXTINF", .. })
        ));
    }

    #[test]
    fn rejects_sequence_past_u64_range() {
        let text = "#EXTM3U\n\
            #EXT-X-MEDIA-SEQUENCE:18446744073709551615\n\
            #EXTINF:2,\n\
            a.ts\n\
            #EXTINF:2,\n\
            b.ts\n";
        assert!(matches!(
            parse(text),
            Err(PlaylistError::InvalidTag { tag: "#EXT-X-MEDIA-SEQUENCE", .. })
        ));
    }

    #[test]
    fn last_representable_sequence_is_accepted() {
        let text = "#EXTM3U\n#EXT-X-MEDIA-SEQUENCE:18446744073709551615\n#EXTINF:2,\na.ts\n";
        let Playlist::Media(media) = parse(text).unwrap() else {
            panic!("expected a media playlist");
        };
        assert_eq!(media.segments[0].sequence, u64::MAX);
        assert_eq!(media.end_sequence(), u64::MAX);
    }

    #[test]
    fn live_edge_and_end_sequence() {
        let text = "#EXTM3U\n#EXT-X-MEDIA-SEQUENCE:10\n\
            #EXTINF:2,\na.ts\n#EXTINF:2,\nb.ts\n#EXTINF:2,\nc.ts\n#EXTINF:2,\nd.ts\n";
        let Playlist::Media(media) = parse(text).unwrap() else {
            panic!("expected a media playlist");
        };
        assert_eq!(media.live_edge(3), 11);
        assert_eq!(media.live_edge(10), 10);
        assert_eq!(media.end_sequence(), 14);

        let Playlist::Media(empty) = parse("#EXTM3U\n#EXT-X-MEDIA-SEQUENCE:7\n").unwrap() else {
            panic!("expected a media playlist");
        };
        assert_eq!(empty.live_edge(3), 7);
        assert_eq!(empty.end_sequence(), 7);
    }

    #[test]
    fn rejects_dangling_tags() {
        assert_eq!(
            parse("#EXTM3U\n#EXTINF:2,\n"),
            Err(PlaylistError::MissingUri("#EXTINF"))
        );
    }
}
