//! GraphQL documents sent to the platform

/// Accepted problems of the session user, paged by `skip`/`limit`
pub const ACCEPTED_SLUGS_QUERY: &str = r#"
query userSolvedProblems($categorySlug: String, $skip: Int, $limit: Int, $filters: QuestionListFilterInput) {
  problemsetQuestionList: questionList(
    categorySlug: $categorySlug
    skip: $skip
    limit: $limit
    filters: $filters
  ) {
    total: totalNum
    questions: data {
      titleSlug
    }
  }
}
"#;

/// Full problem catalog with metadata, paged by `skip`/`limit`
pub const PROBLEM_CATALOG_QUERY: &str = r#"
query problemsetQuestionList($categorySlug: String, $limit: Int, $skip: Int, $filters: QuestionListFilterInput) {
  problemsetQuestionList: questionList(
    categorySlug: $categorySlug
    limit: $limit
    skip: $skip
    filters: $filters
  ) {
    total: totalNum
    questions: data {
      title
      titleSlug
      acRate
      difficulty
      topicTags {
        name
        slug
      }
    }
  }
}
"#;

/// Title of a single problem
pub const QUESTION_TITLE_QUERY: &str = r#"
query questionTitle($titleSlug: String!) {
  question(titleSlug: $titleSlug) {
    title
    titleSlug
  }
}
"#;

/// Submission history of the session user, paged by `offset`/`limit`/`lastKey`
pub const SUBMISSION_LIST_QUERY: &str = r#"
query submissionList($offset: Int!, $limit: Int!, $lastKey: String) {
  submissionList(offset: $offset, limit: $limit, lastKey: $lastKey) {
    lastKey
    hasNext
    submissions {
      title
      titleSlug
      statusDisplay
      timestamp
    }
  }
}
"#;
