use serde::{Deserialize, Serialize};

/// A billable treatment in a clinic's price list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub default_price: f64,
    pub clinic_id: String,
}

const DEFAULT_SERVICE_NAMES: &[&str] = &[
    // therapeutic
    "Пломбирование корневых каналов",
    "Пломбирование передних зубов",
    "Пломбирование боковых зубов",
    "Реставрация зуба",
    "Деветелизирующая паста",
    "Стекловолоконный штифт",
    // prosthetic
    "Металлокерамическая коронка",
    "Диоксид цирконий",
    "Открыто винтовая коронка на имплантах",
    "Культовая вкладка",
    "Напиленные коронки",
    "Бюгельный протез",
    "Простой съемный протез",
    "Баллочная фиксация на имплантах с диоксид цирконий",
    "Баллочная акриловая фиксация на имплантах",
    "Диоксид цирконий с абатменом",
    // surgical
    "Удаление зуба",
    "Пластика уздечки",
    "Удаление ретентрованного зуба",
    "Удаление зуба мудрости",
    "Зашивание лунки",
    // implantology
    "Имплантация Dentium",
    "Имплантация Osstem",
    "Имплантация Impro",
    "Формирователь десны",
    "Мультиюниты",
    "Мембрана",
    "Костная пластика",
    "Синус лифтинг",
    // consumables
    "Одноразовый набор",
    "Тесты на гепатит В С и СПИД",
    "Анестезия",
    "Рентген",
];

/// Starter price list for a clinic that has none yet. Prices start at 0
/// and ids are left empty for the server to assign.
pub fn default_services(clinic_id: &str) -> Vec<Service> {
    DEFAULT_SERVICE_NAMES
        .iter()
        .map(|name| Service {
            id: String::new(),
            name: name.to_string(),
            default_price: 0.0,
            clinic_id: clinic_id.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_belong_to_the_clinic() {
        let list = default_services("clinic_1");
        assert_eq!(list.len(), DEFAULT_SERVICE_NAMES.len());
        assert!(list.iter().all(|s| s.clinic_id == "clinic_1" && s.default_price == 0.0));
        assert!(list.iter().all(|s| s.id.is_empty()));
    }

    #[test]
    fn empty_id_is_left_for_the_server() {
        let json = serde_json::to_value(&default_services("c")[0]).unwrap();
        assert_eq!(json["id"], "");
        assert_eq!(json["defaultPrice"], 0.0);
    }
}
