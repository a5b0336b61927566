//! Human-readable thread names.

use uuid::Uuid;

const ADJECTIVES: [&str; 32] = [
    "amber", "brisk", "calm", "clever", "crimson", "dapper", "eager", "fuzzy", "gentle",
    "golden", "hidden", "humble", "icy", "jolly", "keen", "lively", "lucky", "mellow", "misty",
    "nimble", "plucky", "quiet", "rapid", "rustic", "silent", "sunny", "swift", "tidy",
    "vivid", "wandering", "witty", "zesty",
];

const NOUNS: [&str; 32] = [
    "badger", "beacon", "brook", "canyon", "cedar", "comet", "falcon", "fern", "glacier",
    "harbor", "heron", "island", "lantern", "lynx", "meadow", "otter", "pebble", "pine",
    "quartz", "raven", "reef", "river", "sparrow", "spruce", "summit", "thistle", "tundra",
    "valley", "willow", "wren", "yak", "zephyr",
];

/// Generate a name like `swift-otter-0427`.
pub fn generate_name() -> String {
    let id = Uuid::new_v4();
    let bytes = id.as_bytes();
    let adjective = ADJECTIVES[bytes[0] as usize % ADJECTIVES.len()];
    let noun = NOUNS[bytes[1] as usize % NOUNS.len()];
    let number = u16::from_be_bytes([bytes[2], bytes[3]]) % 10_000;
    format!("{adjective}-{noun}-{number:04}")
}
