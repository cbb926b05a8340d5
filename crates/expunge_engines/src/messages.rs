#![forbid(unsafe_code)]

//! Canned verdict messages and the date arithmetic they interpolate.
//!
//! These strings are the de facto contract with any presentation layer:
//! downstream collaborators pattern-match on "Expungeable" vs
//! "Not expungeable", so wording changes here are breaking changes.

use chrono::{Duration, NaiveDate};

pub const RECLASSIFIED_WAIT_DAYS: i64 = 30;
pub const DEFERRED_MISDEMEANOR_WAIT_DAYS: i64 = 365;
pub const FIVE_YEAR_WAIT_DAYS: i64 = 1825;
pub const SEVEN_YEAR_LOOKBACK_DAYS: i64 = 2555;
pub const TEN_YEAR_WAIT_DAYS: i64 = 3650;

pub fn format_date_mdy(date: NaiveDate) -> String {
    date.format("%m-%d-%Y").to_string()
}

pub fn eligibility_date(sentencing_date: NaiveDate, offset_days: i64) -> NaiveDate {
    sentencing_date + Duration::days(offset_days)
}

pub const GRANT_ARREST: &str = "Expungeable because of arrest, no charges filed";

pub const GRANT_RESOLVED: &str = "Immediately expungeable because case resolved by any of \nAcquittal\nReversed on appeal, dismissed by DA\nDismissed on appeal\nDNA dismissal\nFull pardon by governor\nUnder 18, full pardon\nIdentity theft";

pub const DENY_RECLASSIFIED_WAIT: &str =
    "Reclassified as misdemeanor. Not expungeable due to time since sentencing < 30 days.";
pub const DENY_RECLASSIFIED_FINES: &str =
    "Reclassified as misdemeanor. Not expungeable since fines, fees, or restitution not paid.";
pub const DENY_RECLASSIFIED_TREATMENT: &str =
    "Reclassified as misdemeanor. Not expungeable since treatment not finished.";
pub const GRANT_RECLASSIFIED: &str = "Expungeable due to reclassification as misdemeanor, > 30 days since sentencing, fines, fees, or restitution paid, and if relevant, treatment program completed.";

pub const DENY_DRUG_PROGRAM: &str = "Not expungeable since drug program not completed.";
pub const DENY_FINES_UNPAID: &str =
    "Not expungeable since fines, fees, or restitution not paid.";
pub const GRANT_DRUG_FELONY: &str = "Expungeable due to dismissal after drug court, program completed, and fines, fees, or restitution paid.";
pub const GRANT_DRUG_MISDEMEANOR: &str = "Expungeable due to dismissal after drug court, drug program completed, and fines, fees, and restitution fully paid.";

pub fn deny_too_many_convictions(count: usize) -> String {
    format!("Not expungeable because client has {count} felony convictions. Recommend they seek a pardon.")
}

pub const GRANT_NONVIOLENT: &str = "Expungeable due to nonviolent felony criteria (no other felony convictions, no misdemeanor convictions in the last 7 years, 5 years since sentence completion, all fines paid).";

pub fn deny_five_year_wait(eligible_after: NaiveDate) -> String {
    format!(
        "Not expungeable. 5 year waiting period not yet reached. Client may be eligible after {}",
        format_date_mdy(eligible_after)
    )
}

pub const DENY_FINES_NOT_PAID: &str = "Not expungeable. Fines not paid.";
pub const DENY_VIOLENT_SECTION_571: &str = "Not expungeable. Violent felony under Section 571.";
pub const DENY_MULTIPLE_CONVICTIONS: &str =
    "Not expungeable. More than one felony conviction.";

pub fn deny_recent_misdemeanors(screen_again_after: NaiveDate) -> String {
    format!(
        "Not expungeable. Misdemeanor convictions within the last 7 years. Screen again after {}.",
        format_date_mdy(screen_again_after)
    )
}

pub const GRANT_TEN_YEAR: &str = "Expungeable due to criteria: no counts listed in Section 13, 10 years since sentence completion, all fines paid.";

pub fn deny_fines_waiver_path(eligible_after: NaiveDate) -> String {
    format!(
        "Not expungeable. After {}, this individual may be eligible for expungement after paying their fines and fees or obtaining waiver of their fines and fees pursuant to 22 O.S. \u{a7} 983. More information about the waiver process can be found <here, https://www.oklahomafinesandfeeshelp.org/>.",
        format_date_mdy(eligible_after)
    )
}

pub fn deny_pardon_path(pardon_after: NaiveDate, alternative_after: Option<NaiveDate>) -> String {
    let mut message = format!(
        "Not expungeable. This individual may be eligible for expungement after receiving a pardon from the Governor after this date: {}. More information about filing for a pardon can be found <here, https://oklahoma.gov/ppb.html>.",
        format_date_mdy(pardon_after)
    );
    if let Some(alternative) = alternative_after {
        message.push_str(&format!(
            " Alternatively, this case may be expungeable after this date: {}",
            format_date_mdy(alternative)
        ));
    }
    message
}

pub const DENY_TOO_MANY_COUNTS: &str = "Not expungeable. Too many felony counts.";
pub const DENY_SECTION_13_OR_SORA: &str =
    "Not expungeable. Violent felony under Section 13.1 of Title 21 or SORA.";

pub const DENY_SOL_NOT_EXPIRED: &str = "Not expungeable. The SOL hasn't expired, DA hasn't confirmed they won't refile, and case hasn't been dismissed with paid or waived costs.";
pub const GRANT_SOL_EXPIRED: &str = "Expungeable. The SOL has expired, or DA has confirmed they won't refile, or case has been dismissed with paid or waived costs.";

pub const DENY_UNCLEARED_FELONY_CONVICTIONS: &str =
    "Not expungeable because client unable to expunge all felony convictions.";
pub const DENY_FELONY_BLOCK: &str =
    "Not expungeable because of non-expungeable felony convictions.";

pub const GRANT_SMALL_FINE: &str =
    "Expungeable. Fine < $501 and fines, fees, and restitution fully paid.";

pub fn deny_misdemeanor_five_year(eligible_after: NaiveDate) -> String {
    format!(
        "Not expungeable since < 5 years since end of sentence. May be eligible after {}.",
        format_date_mdy(eligible_after)
    )
}

pub const GRANT_MISDEMEANOR_FIVE_YEAR: &str =
    "Expungeable. >= 5 years since sentencing, and fines, fees, and restitution fully paid.";

pub const DENY_DEFERRED_FINES: &str =
    "Not expungeable. Fines, fees, and restitution not fully paid.";

pub fn deny_deferred_one_year(eligible_after: NaiveDate) -> String {
    format!(
        "Not expungeable. < 1 year since dismissal. May be eligible after {}.",
        format_date_mdy(eligible_after)
    )
}

pub const GRANT_DEFERRED: &str =
    "Expungeable. > 1 year since dismissal and fines, fees, and restitution fully paid.";

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn at_messages_01_date_renders_mm_dd_yyyy() {
        assert_eq!(format_date_mdy(date(2027, 3, 5)), "03-05-2027");
    }

    #[test]
    fn at_messages_02_eligibility_date_is_offset_in_days() {
        let sentenced = date(2022, 1, 1);
        assert_eq!(
            eligibility_date(sentenced, FIVE_YEAR_WAIT_DAYS),
            sentenced + Duration::days(1825)
        );
        assert_eq!(
            format_date_mdy(eligibility_date(sentenced, RECLASSIFIED_WAIT_DAYS)),
            "01-31-2022"
        );
    }

    #[test]
    fn at_messages_03_pardon_path_appends_alternative_date() {
        let base = deny_pardon_path(date(2026, 6, 1), None);
        assert!(base.contains("06-01-2026"));
        assert!(!base.contains("Alternatively"));
        let with_alt = deny_pardon_path(date(2026, 6, 1), Some(date(2031, 6, 1)));
        assert!(with_alt.contains("Alternatively"));
        assert!(with_alt.contains("06-01-2031"));
    }
}
