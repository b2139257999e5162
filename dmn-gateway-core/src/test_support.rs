//! Shared fixtures for unit tests

pub const PARTY_NAMESPACE: &str = "urn:example:party";
pub const PARTY_NAME: &str = "Party";

pub const PARTY_ARTIFACT: &str = r#"
models:
  - namespace: urn:example:party
    name: Party
    inputs:
      - { name: Guests, type: number }
      - { name: Mood, type: string }
    decisions:
      - name: Venue
        type: string
        hit_policy: UNIQUE
        inputs: [Guests]
        rules:
          - { when: ["[0..10)"], then: Living room }
          - { when: ["[10..30]"], then: Hall }
          - { when: ["[20..50]"], then: Garden }
      - name: Music
        type: string
        hit_policy: FIRST
        inputs: [Guests, Mood]
        rules:
          - { when: [">= 10", '"festive"'], then: Band }
          - { when: ["-", "-"], then: Playlist }
      - name: Snacks
        type: list<string>
        hit_policy: COLLECT
        inputs: [Guests, Mood]
        rules:
          - { when: [">= 10", "-"], then: Crisps }
          - { when: ["-", '"festive"'], then: Cake }
          - { when: [">= 10", '"festive"'], then: Punch }
"#;
