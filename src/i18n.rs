//! Localized message templates.
//!
//! Templates are looked up by `(Language, MessageKind)` and use `{name}`
//! placeholders that [`render`] substitutes.

use crate::alert::AlertLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    En,
    Uk,
    Pl,
}

impl Language {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "en" => Some(Language::En),
            "uk" => Some(Language::Uk),
            "pl" => Some(Language::Pl),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::En => write!(f, "en"),
            Language::Uk => write!(f, "uk"),
            Language::Pl => write!(f, "pl"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// `{user}`, `{city}`
    Welcome,
    /// `{location}`, `{location_url}`
    HelpIntro,
    HelpIntroNoData,
    HelpBody,
    /// `{city}`, `{pm10}`, `{pm25}`
    CurrentAqi,
    NotAvailable,
    AlertUnhealthy,
    AlertHazardous,
    AlertGood,
    /// `{city}`, `{pm10}`, `{pm25}`
    AlertSummary,
}

impl MessageKind {
    pub fn for_alert(level: AlertLevel) -> Self {
        match level {
            AlertLevel::Unhealthy => MessageKind::AlertUnhealthy,
            AlertLevel::Hazardous => MessageKind::AlertHazardous,
            AlertLevel::Good => MessageKind::AlertGood,
        }
    }
}

const NOWCAST_GUIDE: &str =
    "https://aqicn.org/faq/2015-03-15/air-quality-nowcast-a-beginners-guide/";

pub fn template(language: Language, kind: MessageKind) -> &'static str {
    use Language::*;
    use MessageKind::*;

    match (language, kind) {
        (En, Welcome) => "Hi {user}, I'm an Air Quality Index bot, I will help you to know the actual AQI in {city}. \
                          Please use /help for more information!",
        (Uk, Welcome) => "Привіт {user}, я бот індексу якості повітря, я допоможу вам дізнатися актуальний AQI в {city}. \
                          Будь ласка, скористайтеся /help для отримання додаткової інформації!",
        (Pl, Welcome) => "Cześć {user}, jestem botem wskaźnika jakości powietrza, pomogę Ci dowiedzieć się aktualnego AQI w {city}. \
                          Skorzystaj z /help, aby uzyskać więcej informacji!",

        (En, HelpIntro) => "I'm an Air Quality Index bot, I got information for {location} from {location_url}.",
        (Uk, HelpIntro) => "Я бот індексу якості повітря, я отримав інформацію для {location} з {location_url}.",
        (Pl, HelpIntro) => "Jestem botem wskaźnika jakości powietrza, otrzymałem informacje dla {location} z {location_url}.",

        (En, HelpIntroNoData) => "I'm an Air Quality Index bot, I haven't received any data from the sensor yet.",
        (Uk, HelpIntroNoData) => "Я бот індексу якості повітря, я ще не отримав даних від датчика.",
        (Pl, HelpIntroNoData) => "Jestem botem wskaźnika jakości powietrza, nie otrzymałem jeszcze danych z czujnika.",

        (En, HelpBody) => "\n\n\nPlease use command /aqi or just send any text to get fresh data.\n\n\
                           The air quality index (AQI) is a measure of how clean or polluted the air is.\n\n\
                           Less than 50 is considered as the Good level, 51 to 100 is Moderate, 101 to 150 is \
                           Unhealthy for Sensitive Groups, 151 to 200 is Unhealthy, 201 to 300 is Very Unhealthy \
                           and a level of more than 300 is considered as Hazardous.\n\n\n\
                           More details can be found <a href='{guide}'>here</a>",
        (Uk, HelpBody) => "\n\n\nБудь ласка, скористайтеся командою /aqi або просто надішліть будь-який текст, \
                           щоб отримати свіжі дані.\n\n\
                           Індекс якості повітря (AQI) - це показник того, наскільки чистим або забрудненим є повітря.\n\n\
                           Менше 50 вважається рівнем Good, від 51 до 100 - Moderate, від 101 до 150 - Unhealthy for \
                           Sensitive Groups, від 151 до 200 - Unhealthy, від 201 до 300 - Very Unhealthy, а рівень \
                           більше 300 вважається Hazardous.\n\n\
                           Додаткові відомості можна знайти <a href='{guide}'>тут</a>",
        (Pl, HelpBody) => "\n\n\nSkorzystaj z /aqi albo po prostu wyślij dowolny tekst, aby uzyskać świeże dane.\n\n\
                           Wskaźnik jakości powietrza (AQI) to miara czystości lub zanieczyszczenia powietrza.\n\n\
                           Mniej niż 50 uważa się za dobry poziom, od 51 do 100 jest umiarkowany, od 101 do 150 jest \
                           niezdrowy dla osób wrażliwych, od 151 do 200 jest niezdrowy, od 201 do 300 jest bardzo \
                           niezdrowy, a poziom powyżej 300 uważa się za niebezpieczny.\n\n\
                           Więcej szczegółów można znaleźć <a href='{guide}'>tutaj</a>",

        (En, CurrentAqi) => "Current AQI in {city} is {pm10} for PM10 and {pm25} for PM2.5.",
        (Uk, CurrentAqi) => "Поточний AQI в {city} становить {pm10} для PM10 та {pm25} для PM2.5.",
        (Pl, CurrentAqi) => "Aktualny AQI w {city} wynosi {pm10} dla PM10 i {pm25} dla PM2.5.",

        (En, NotAvailable) => "AQI data is not available at the moment. Please try again later.",
        (Uk, NotAvailable) => "Дані AQI наразі недоступні. Спробуйте ще раз пізніше.",
        (Pl, NotAvailable) => "Dane AQI nie są obecnie dostępne. Spróbuj ponownie później.",

        (En, AlertUnhealthy) => "Be aware, air quality reaches unhealthy levels",
        (Uk, AlertUnhealthy) => "Будьте обережні, якість повітря досягає нездорового рівня",
        (Pl, AlertUnhealthy) => "Uważaj, jakość powietrza osiąga niezdrowy poziom",

        (En, AlertHazardous) => "Be aware, air quality reaches hazardous levels",
        (Uk, AlertHazardous) => "Будьте обережні, якість повітря досягає небезпечного рівня",
        (Pl, AlertHazardous) => "Uważaj, jakość powietrza osiąga niebezpieczny poziom",

        (En, AlertGood) => "Air quality back to a good level",
        (Uk, AlertGood) => "Якість повітря повертається до хорошого рівня",
        (Pl, AlertGood) => "Jakość powietrza wraca do dobrego poziomu",

        (En, AlertSummary) => "Air Quality Index in {city} is {pm10} for PM10 and {pm25} for PM2.5",
        (Uk, AlertSummary) => "Індекс якості повітря в {city} становить {pm10} для PM10 та {pm25} для PM2.5",
        (Pl, AlertSummary) => "Wskaźnik jakości powietrza w {city} wynosi {pm10} dla PM10 i {pm25} dla PM2.5",
    }
}

/// Fill `{name}` placeholders of the `(language, kind)` template.
/// Unknown placeholders are left as they are.
/// Substituted values are never rescanned for placeholders.
pub fn render(language: Language, kind: MessageKind, args: &[(&str, &str)]) -> String {
    let mut rest = template(language, kind);
    let mut text = String::with_capacity(rest.len());

    while let Some(start) = rest.find('{') {
        let tail = &rest[start..];
        let Some(end) = tail.find('}') else {
            break;
        };
        text.push_str(&rest[..start]);
        let name = &tail[1..end];
        let value = match name {
            "guide" => Some(NOWCAST_GUIDE),
            _ => args.iter().find(|(key, _)| *key == name).map(|(_, v)| *v),
        };
        match value {
            Some(value) => text.push_str(value),
            None => text.push_str(&tail[..=end]),
        }
        rest = &tail[end + 1..];
    }
    text.push_str(rest);
    text
}
