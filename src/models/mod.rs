pub mod responsemodel;
pub mod rewardmodel;
pub mod surveymodel;
pub mod usermodel;
