//! Language-templated notification text (§4.5 step 9, §4.6). A generic
//! "updated" template is used when `classify_status` returns `None`, per
//! the decision recorded in DESIGN.md for Open Question (b).

use tracker_core::{ApplicationKey, Lang, StatusCategory};

pub fn status_notification(lang: Lang, key: &ApplicationKey, category: Option<StatusCategory>, status: &str) -> String {
  let sign = category.map(StatusCategory::sign).unwrap_or("⚪️");
  match lang {
    Lang::En => format!("{sign} Application {key}\n{status}"),
    Lang::Cz => format!("{sign} Žádost {key}\n{status}"),
    Lang::Ru => format!("{sign} Заявка {key}\n{status}"),
    Lang::Ua => format!("{sign} Заявка {key}\n{status}"),
  }
}

pub fn expired_notification(lang: Lang, key: &ApplicationKey) -> String {
  match lang {
    Lang::En => format!("⚪️ Application {key} has not been found on the portal for too long and was removed from tracking."),
    Lang::Cz => format!("⚪️ Žádost {key} nebyla na portálu nalezena po příliš dlouhou dobu a byla odstraněna ze sledování."),
    Lang::Ru => format!("⚪️ Заявка {key} слишком долго не находилась на портале и была удалена из отслеживания."),
    Lang::Ua => format!("⚪️ Заявка {key} занадто довго не знаходилась на порталі і була видалена з відстеження."),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key() -> ApplicationKey {
    ApplicationKey {
      number: "12345".into(),
      suffix: None,
      application_type: "TP".into(),
      year: 2023,
    }
  }

  #[test]
  fn unknown_category_uses_generic_sign() {
    let text = status_notification(Lang::En, &key(), None, "gibberish");
    assert!(text.starts_with("⚪️"));
  }

  #[test]
  fn approved_category_uses_green_sign() {
    let text = status_notification(Lang::En, &key(), Some(StatusCategory::Approved), "bylo povoleno");
    assert!(text.starts_with("🟢"));
  }
}
