//! Week layouts: where each piece of a timecard lands in the template.

/// Cells that receive the caller-supplied weekly totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotalsCells {
    pub on_call: &'static str,
    pub overtime: &'static str,
}

/// Fixed cell coordinates for one week tab of the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekLayout {
    pub week: i64,
    pub sheet: &'static str,
    pub employee_cell: &'static str,
    /// Top of the Sun..Sat date column of the main hours block
    pub primary_dates_top: &'static str,
    /// Top of the Sun..Sat date column of the overtime block
    pub overtime_dates_top: &'static str,
    /// The big "Sun Date Start" box
    pub week_start_cell: &'static str,
    pub totals: Option<TotalsCells>,
}

const TOTALS: TotalsCells = TotalsCells {
    on_call: "D12",
    overtime: "D23",
};

/// Every layout the template knows about. The first entry is the fallback.
pub const WEEK_LAYOUTS: [WeekLayout; 2] = [
    WeekLayout {
        week: 1,
        sheet: "Week 1",
        employee_cell: "M2",
        primary_dates_top: "B5",
        overtime_dates_top: "B16",
        week_start_cell: "B4",
        totals: Some(TOTALS),
    },
    WeekLayout {
        week: 2,
        sheet: "Week 2",
        employee_cell: "M2",
        primary_dates_top: "B5",
        overtime_dates_top: "B16",
        week_start_cell: "B4",
        totals: Some(TOTALS),
    },
];

/// Resolve a week selector; unknown selectors fall back to week 1.
pub fn resolve_layout(week_number: i64) -> &'static WeekLayout {
    WEEK_LAYOUTS
        .iter()
        .find(|layout| layout.week == week_number)
        .unwrap_or(&WEEK_LAYOUTS[0])
}
