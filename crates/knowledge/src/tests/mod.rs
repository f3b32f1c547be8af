mod learn_and_answer;
