use click_core::{ClickEvent, ClickKind, MeterChange, TempoChange};

pub struct TimelineFormatter {
    json: bool,
}

impl TimelineFormatter {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn build_output(
        &self,
        events: &[ClickEvent],
        tempo_changes: &[TempoChange],
        meter_changes: &[MeterChange],
    ) -> serde_json::Result<String> {
        if self.json {
            self.build_output_json(events, tempo_changes, meter_changes)
        } else {
            Ok(self.build_output_text(events))
        }
    }

    /// Build JSON output of the timeline
    pub fn build_output_json(
        &self,
        events: &[ClickEvent],
        tempo_changes: &[TempoChange],
        meter_changes: &[MeterChange],
    ) -> serde_json::Result<String> {
        #[derive(serde::Serialize)]
        #[serde(rename_all = "camelCase")]
        struct JsonOutput<'a> {
            tempo_changes: &'a [TempoChange],
            meter_changes: &'a [MeterChange],
            events: &'a [ClickEvent],
        }

        let output = JsonOutput {
            tempo_changes,
            meter_changes,
            events,
        };

        serde_json::to_string_pretty(&output)
    }

    /// One line per click: time, bar.beat, kind and spoken cue
    pub fn build_output_text(&self, events: &[ClickEvent]) -> String {
        let mut lines = Vec::with_capacity(events.len());
        let mut bar = 0u32;
        let mut beat = 0u32;

        for event in events {
            let position = match event.kind {
                ClickKind::PreparePrimary | ClickKind::PrepareSecondary => {
                    if event.kind == ClickKind::PreparePrimary {
                        beat = 0;
                    }
                    beat += 1;
                    format!("-.{}", beat)
                }
                ClickKind::Primary | ClickKind::Secondary => {
                    if event.kind == ClickKind::Primary {
                        bar += 1;
                        beat = 0;
                    }
                    beat += 1;
                    format!("{}.{}", bar, beat)
                }
                ClickKind::Final => "end".to_string(),
            };

            let cue = event
                .voice_cue
                .map(|cue| format!("  \"{}\"", cue))
                .unwrap_or_default();

            lines.push(format!(
                "{:>10.3}s  {:<8} {}{}",
                event.seconds(),
                position,
                event.kind,
                cue
            ));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use click_core::{generate, BarAnnouncer, TempoMap};

    fn timeline() -> Vec<ClickEvent> {
        let map = TempoMap::constant(480, 500_000);
        let mut events = generate(&map, &[], Some(8 * 480), 1).unwrap();
        BarAnnouncer::new(&[2]).annotate(&mut events);
        events
    }

    #[test]
    fn test_text_output() {
        let text = TimelineFormatter::new(false).build_output_text(&timeline());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 13);
        assert_eq!(lines[0], "     0.000s  -.1      prepare-primary  \"1\"");
        assert_eq!(lines[4], "     2.000s  1.1      primary  \"1\"");
        assert_eq!(lines[9], "     4.500s  2.2      secondary");
        assert_eq!(lines[12], "     6.000s  end      final");
    }

    #[test]
    fn test_json_output() {
        let events = timeline();
        let json = TimelineFormatter::new(true)
            .build_output(&events, &[TempoChange::new(0, 500_000)], &[])
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["events"].as_array().unwrap().len(), 13);
        assert_eq!(value["events"][4]["kind"], "Primary");
        assert_eq!(value["events"][4]["voice_cue"], 1);
        assert_eq!(value["tempoChanges"][0]["micros_per_quarter"], 500_000);
    }
}
