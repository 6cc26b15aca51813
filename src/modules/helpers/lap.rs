use log::warn;

use crate::modules::helpers::duration::DurationHelper;
use crate::modules::race_api::ExtractedLap;

pub struct LapHelper {}

/// a lap that survived parsing, with the duration resolved to exact
/// milliseconds and the original lap number kept as declared
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLap {
    pub lap_number: i32,
    pub lap_time: i64,
}

/// the derived aggregate triple of one drivers race, plus the laps the
/// aggregates were computed from. all three fields are `None` when no
/// lap survived parsing, a result with no data is not a result of zero
/// duration.
#[derive(Debug, Clone, PartialEq)]
pub struct LapAggregates {
    pub total_time: Option<i64>,
    pub fastest_lap: Option<i64>,
    pub average_lap: Option<i64>,
    pub laps: Vec<ResolvedLap>,
}

impl LapHelper {
    /// # aggregate the raw laps of one driver
    /// resolve the lap time text of every entry and derive the total,
    /// fastest, and average lap from the laps that parse. entries with
    /// missing, unparseable, or zero lap times are skipped with a warn
    /// log; extraction noise must not block the rest of the row. any
    /// fastest/average the extraction service supplied is ignored, the
    /// aggregates are always recomputed from the laps themselves.
    ///
    /// laps keep their declared lap number. when an entry has none the
    /// lap falls back to its 1-based position among the kept laps.
    ///
    /// ## Arguments
    /// * `entries` - the raw lap entries of a single driver, in order
    ///
    /// ## Returns
    /// * `LapAggregates` - the derived aggregates and the kept laps
    pub fn aggregate_laps(entries: &[ExtractedLap]) -> LapAggregates {
        let mut laps: Vec<ResolvedLap> = Vec::new();
        let mut total: i64 = 0;

        for entry in entries {
            let text = match entry.lap_time.as_deref() {
                Some(text) => text,
                None => {
                    warn!(target:"helpers/lap:aggregate_laps", "lap entry without a time field: {:?}", entry);
                    continue;
                }
            };

            let millis = match DurationHelper::parse_laptime(text) {
                Some(millis) if millis > 0 => millis,
                _ => {
                    warn!(target:"helpers/lap:aggregate_laps", "dropping unusable lap time: {:?}", text);
                    continue;
                }
            };

            // lap numbers are positive and driver local; a missing or
            // nonsensical declared number falls back to the kept position
            let lap_number = match entry.lap_number {
                Some(number) if number > 0 => number,
                _ => laps.len() as i32 + 1,
            };
            total += millis;
            laps.push(ResolvedLap {
                lap_number,
                lap_time: millis,
            });
        }

        let fastest = laps.iter().map(|lap| lap.lap_time).min();
        let average = if laps.is_empty() {
            None
        } else {
            Some(total / laps.len() as i64)
        };

        LapAggregates {
            total_time: if total > 0 { Some(total) } else { None },
            fastest_lap: fastest,
            average_lap: average,
            laps,
        }
    }
}
