//! This module stores the column names, sheet names and reserved label values shared by the
//! pipeline stages and the persisted tables. Note that these must stay in sync with the layout of
//! the input workbooks!

// Key columns
pub const BID: &str = "BID";
pub const BARANGAY_NAME: &str = "barangay_name";
pub const BARANGAY_ALIAS: &str = "(Barangay)";

// Reserved label values
pub const BARANGAY_SECTOR: &str = "(Barangay)";
pub const NONE: &str = "None";
pub const ALL_HAZARDS: &str = "All Hazards";
pub const INDEX_ASPECT: &str = "Index";
pub const BARANGAY_DETAIL: &str = "Barangay";

// Label levels
pub const SECTOR: &str = "Sector";
pub const ELEMENT: &str = "Element";
pub const HAZARD: &str = "Hazard";
pub const DISASTER_RISK_ASPECT: &str = "Disaster Risk Aspect";
pub const DETAIL: &str = "Detail";
pub const FLAT_KEY: &str = "flat_key";

// Library table
pub const SID: &str = "SID";

// Element group manifest
pub const GROUP_FILE_NAME: &str = "file_name";
pub const GROUP_DATA_NROWS: &str = "data_nrows";
pub const GROUP_DATA_NCOLS: &str = "data_ncols";
pub const GROUP_REFERENCE_SHEET: &str = "reference_sheet";

// Data dictionary
pub const DICTIONARY_SHEET: &str = "dictionary";
pub const DICT_COLUMN_NAME: &str = "column_name";
pub const DICT_DISASTER_RISK_ASPECT: &str = "disaster_risk_aspect";
pub const DICT_DATA_TYPE: &str = "data_type";
pub const DICT_IS_LIST: &str = "is_list";
pub const DICT_DROP: &str = "drop";
pub const DICT_UNIQUE: &str = "unique";
pub const DICT_MISSING_TYPE: &str = "missing";

// Barangay reference table
pub const REF_ORIG_NAME: &str = "orig_name";
pub const REF_GID_3: &str = "GID_3";

// Indicator values
pub const YES: &str = "Yes";
pub const NO: &str = "No";

// Summary details
pub const OVERALL_RISK: &str = "Overall Risk";
pub const GEOGRAPHICAL_AREA: &str = "Geographical Area Or Ecosystem";
pub const DEGREE_OF_IMPACT_CATEGORY: &str = "Degree Of Impact Category";
pub const VULNERABILITY_CATEGORY: &str = "Vulnerability Category";
pub const RISK_CATEGORY: &str = "Risk Category";
pub const LIKELIHOOD_OF_OCCURRENCE: &str = "Likelihood Of Occurrence";
pub const EXPOSURE_SCORE: &str = "Exposure Score";
pub const SENSITIVITY_SCORE: &str = "Sensitivity Score";
pub const DEGREE_OF_IMPACT_SCORE: &str = "Degree Of Impact Score";
pub const ADAPTIVE_CAPACITY_SCORE: &str = "Adaptive Capacity Score";
pub const VULNERABILITY_SCORE: &str = "Vulnerability Score";
pub const SEVERITY_OF_CONSEQUENCE_SCORE: &str = "Severity Of Consequence Score";
pub const RISK_SCORE: &str = "Risk Score";
