//! Amazon Polly 区域/引擎静态表
//!
//! 引擎支持是配置而非运行时数据，未知区域返回空集合

use std::collections::BTreeSet;

use crate::domain::voice::{Engine, Region};

const STANDARD_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "af-south-1",
    "ap-east-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-south-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-southeast-5",
    "cn-northwest-1",
    "ca-central-1",
    "eu-central-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-south-2",
    "eu-north-1",
    "me-south-1",
    "sa-east-1",
    "us-gov-west-1",
];

const NEURAL_REGIONS: &[&str] = &[
    "us-east-1",
    "us-west-2",
    "af-south-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-south-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-southeast-5",
    "ca-central-1",
    "eu-central-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-south-2",
    "us-gov-west-1",
];

const LONG_FORM_REGIONS: &[&str] = &["us-east-1"];

const GENERATIVE_REGIONS: &[&str] = &["us-east-1", "us-west-2", "eu-central-1"];

fn regions_of(engine: Engine) -> &'static [&'static str] {
    match engine {
        Engine::Standard => STANDARD_REGIONS,
        Engine::Neural => NEURAL_REGIONS,
        Engine::LongForm => LONG_FORM_REGIONS,
        Engine::Generative => GENERATIVE_REGIONS,
    }
}

/// 某区域支持的引擎（按 `Engine::ALL` 顺序）
pub fn engines_for(region: &Region) -> Vec<Engine> {
    Engine::ALL
        .into_iter()
        .filter(|engine| regions_of(*engine).contains(&region.as_str()))
        .collect()
}

/// 静态表中出现过的所有区域，排序去重
pub fn known_regions() -> Vec<Region> {
    let names: BTreeSet<&str> = Engine::ALL
        .into_iter()
        .flat_map(|engine| regions_of(engine).iter().copied())
        .collect();
    names
        .into_iter()
        .filter_map(|name| Region::new(name).ok())
        .collect()
}
