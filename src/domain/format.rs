//! Display templates
//!
//! Message bodies are sent with HTML parse mode and must stay byte-compatible
//! with what subscribers already receive.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::fmt::Write;

use super::snapshot::{RateSnapshot, SnapshotError};

/// Fixed timezone all displayed dates and the daily broadcast use
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Almaty;

/// Currencies listed by "other currencies", in display order
pub const OTHER_CURRENCIES: [(&str, &str); 6] = [
    ("🇧🇾", "BYN"),
    ("🇺🇦", "UAH"),
    ("🇺🇿", "UZS"),
    ("🇰🇬", "KGS"),
    ("🇹🇭", "THB"),
    ("🇹🇷", "TRY"),
];

/// Codes a CBR snapshot must carry to be displayable
pub const CBR_REQUIRED: [&str; 3] = ["USD", "EUR", "KZT"];

/// Codes an NBK snapshot must carry to be displayable
pub const NBK_REQUIRED: [&str; 3] = ["USD", "EUR", "RUB"];

/// Fixed user-facing strings
pub mod texts {
    pub const MENU_PROMPT: &str = "Выберите действие:";
    pub const RATE_LIMITED: &str = "⏳ Слишком часто, попробуйте позже.";
    pub const SUBSCRIPTION_MENU: &str =
        "📢 Уведомления приходят каждый день в 09:30 по времени Астаны.\nИсточник: НБ РК.";
    pub const SUBSCRIBED: &str = "✅ Вы подписались на ежедневные уведомления.";
    pub const ALREADY_SUBSCRIBED: &str = "⚠️ Вы уже подписаны на уведомления.";
    pub const UNSUBSCRIBED: &str = "❌ Вы отписались от уведомлений.";
    pub const NOT_SUBSCRIBED: &str = "⚠️ Вы не подписаны на уведомления.";
    pub const FETCH_FAILED: &str = "⚠️ Не удалось получить курсы валют, попробуйте позже.";
    pub const GENERIC_FAILURE: &str = "⚠️ Произошла ошибка, попробуйте позже.";
    pub const DAILY_HEADER: &str = "📢 Ежедневное уведомление:\n\n";

    pub const BUTTON_CBR: &str = "📊 Курс ЦБ РФ";
    pub const BUTTON_NBK: &str = "📊 Курс НБ РК";
    pub const BUTTON_OTHER: &str = "🌍 Остальные валюты";
    pub const BUTTON_SUBSCRIPTION: &str = "🔔 Подписка на уведомления";
    pub const BUTTON_SUBSCRIBE: &str = "✅ Подписаться";
    pub const BUTTON_UNSUBSCRIBE: &str = "❌ Отписаться";
}

/// Calendar date of `now` in `tz`, independent of the host timezone
pub fn today_in(tz: Tz, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

fn display_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// CBR rates in rubles; KZT is shown per 100 units
pub fn format_cbr(rates: &RateSnapshot, date: NaiveDate) -> Result<String, SnapshotError> {
    rates.require(&CBR_REQUIRED)?;
    let usd = rates.get("USD").unwrap_or_default();
    let eur = rates.get("EUR").unwrap_or_default();
    let kzt = rates.get("KZT").unwrap_or_default();

    Ok(format!(
        "📅 Курс ЦБ РФ ({})\n\n\
         🇺🇸 1 USD | {:.2} ₽\n\
         🇪🇺 1 EUR | {:.2} ₽\n\
         🇰🇿 100 KZT | {:.2} ₽\n\
         🇷🇺 1 RUB | 1 ₽",
        display_date(date),
        usd,
        eur,
        kzt * 100.0,
    ))
}

/// NBK rates in tenge
pub fn format_nbk(rates: &RateSnapshot, date: NaiveDate) -> Result<String, SnapshotError> {
    rates.require(&NBK_REQUIRED)?;
    let usd = rates.get("USD").unwrap_or_default();
    let eur = rates.get("EUR").unwrap_or_default();
    let rub = rates.get("RUB").unwrap_or_default();

    Ok(format!(
        "📅 Курс НБ РК ({})\n\n\
         🇺🇸 1 USD | {:.2} ₸\n\
         🇪🇺 1 EUR | {:.2} ₸\n\
         🇷🇺 1 RUB | {:.2} ₸\n\
         🇰🇿 1 KZT | 1 ₸",
        display_date(date),
        usd,
        eur,
        rub,
    ))
}

/// Secondary NBK currencies; codes absent from the snapshot are skipped
pub fn format_other(rates: &RateSnapshot, date: NaiveDate) -> String {
    let mut text = format!(
        "📅 Остальные валюты ({})\n<i>(данные НБ РК)</i>\n\n",
        display_date(date)
    );
    for (flag, code) in OTHER_CURRENCIES {
        if let Some(value) = rates.get(code) {
            // Writing into a String cannot fail
            let _ = writeln!(text, "{} 1 {} | {:.2} ₸", flag, code, value);
        }
    }
    text
}

/// Body of the daily broadcast
pub fn format_daily(rates: &RateSnapshot, date: NaiveDate) -> Result<String, SnapshotError> {
    Ok(format!("{}{}", texts::DAILY_HEADER, format_nbk(rates, date)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::Provider;
    use chrono::TimeZone;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()
    }

    fn nbk_snapshot() -> RateSnapshot {
        RateSnapshot::new(Provider::Nbk, [("USD", 1.0), ("EUR", 1.1), ("RUB", 0.012)]).unwrap()
    }

    #[test]
    fn test_format_nbk_values() {
        let text = format_nbk(&nbk_snapshot(), date()).unwrap();
        assert!(text.contains("1 USD | 1.00"));
        assert!(text.contains("1 EUR | 1.10"));
        assert!(text.contains("1 RUB | 0.01"));
    }

    #[test]
    fn test_format_nbk_exact_layout() {
        let text = format_nbk(&nbk_snapshot(), date()).unwrap();
        assert_eq!(
            text,
            "📅 Курс НБ РК (07.03.2025)\n\n\
             🇺🇸 1 USD | 1.00 ₸\n\
             🇪🇺 1 EUR | 1.10 ₸\n\
             🇷🇺 1 RUB | 0.01 ₸\n\
             🇰🇿 1 KZT | 1 ₸"
        );
    }

    #[test]
    fn test_format_cbr_shows_kzt_per_hundred() {
        let snapshot =
            RateSnapshot::new(Provider::Cbr, [("USD", 81.5), ("EUR", 94.257), ("KZT", 0.1612)])
                .unwrap();
        let text = format_cbr(&snapshot, date()).unwrap();
        assert_eq!(
            text,
            "📅 Курс ЦБ РФ (07.03.2025)\n\n\
             🇺🇸 1 USD | 81.50 ₽\n\
             🇪🇺 1 EUR | 94.26 ₽\n\
             🇰🇿 100 KZT | 16.12 ₽\n\
             🇷🇺 1 RUB | 1 ₽"
        );
    }

    #[test]
    fn test_format_cbr_requires_kzt() {
        let snapshot = RateSnapshot::new(Provider::Cbr, [("USD", 81.5), ("EUR", 94.2)]).unwrap();
        assert_eq!(
            format_cbr(&snapshot, date()),
            Err(SnapshotError::MissingCurrency("KZT".to_string()))
        );
    }

    #[test]
    fn test_format_other_skips_missing_codes() {
        let snapshot = RateSnapshot::new(
            Provider::Nbk,
            [("USD", 470.0), ("TRY", 13.456), ("BYN", 150.0), ("UZS", 0.0371)],
        )
        .unwrap();
        let text = format_other(&snapshot, date());
        assert_eq!(
            text,
            "📅 Остальные валюты (07.03.2025)\n<i>(данные НБ РК)</i>\n\n\
             🇧🇾 1 BYN | 150.00 ₸\n\
             🇺🇿 1 UZS | 0.04 ₸\n\
             🇹🇷 1 TRY | 13.46 ₸\n"
        );
        assert!(!text.contains("USD"));
    }

    #[test]
    fn test_format_daily_prefix() {
        let text = format_daily(&nbk_snapshot(), date()).unwrap();
        assert!(text.starts_with("📢 Ежедневное уведомление:\n\n📅 Курс НБ РК (07.03.2025)"));
    }

    #[test]
    fn test_today_in_almaty_crosses_midnight_before_utc() {
        // 20:00 UTC is already the next day in Almaty (UTC+5)
        let now = Utc.with_ymd_and_hms(2025, 3, 6, 20, 0, 0).unwrap();
        assert_eq!(today_in(DEFAULT_TIMEZONE, now), date());
    }
}
