/// Summaries over the fetched report set.
///
/// Only simple grouping lives here; the map itself plots every report
/// individually.
///
/// Submodules:
/// - `groupings`: counts reports per disease label.

pub mod groupings;
