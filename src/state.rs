use std::sync::Arc;

use crate::config::AppSettings;
use crate::content::QuestionBankCache;
use crate::scoring::ScoreLedger;
use crate::store::StoreHandle;

#[derive(Clone)]
pub struct AppState {
    pub store: StoreHandle,
    pub bank: Arc<QuestionBankCache>,
    pub ledger: Arc<ScoreLedger>,
    pub settings: Arc<AppSettings>,
}
